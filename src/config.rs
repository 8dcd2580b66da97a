//! Driver configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main driver configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Webhook server configuration
    pub gateway: GatewayConfig,

    /// Twilio account configuration
    pub twilio: TwilioConfig,

    /// Cache configuration
    pub cache: CacheConfig,
}

impl DriverConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| {
            Error::Config(format!("Failed to load {}: {}", path.display(), e))
        })
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Webhook server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Path Twilio posts inbound messages to
    pub webhook_path: String,

    /// Public base URL Twilio uses to reach this server (e.g. behind a proxy).
    /// Signatures are computed over the public URL, so this must match the
    /// webhook URL configured in the Twilio console.
    pub public_url: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            webhook_path: "/twilio/message".to_string(),
            public_url: None,
        }
    }
}

/// Twilio account configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwilioConfig {
    /// Account SID
    pub account_sid: String,

    /// Name of the environment variable holding the auth token
    pub auth_token_ref: String,

    /// Sender number used for outbound sends
    pub from_number: String,

    /// Messaging API base URL
    pub api_base_url: String,

    /// Outbound request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token_ref: "TWILIO_AUTH_TOKEN".to_string(),
            from_number: String::new(),
            api_base_url: "https://api.twilio.com".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl TwilioConfig {
    /// Resolve the auth token from its environment variable
    pub fn resolve_auth_token(&self) -> Result<String> {
        resolve_credential(&self.auth_token_ref)
    }

    /// Outbound request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of the "message sent" marker in seconds
    pub sent_marker_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sent_marker_ttl_secs: 10,
        }
    }
}

impl CacheConfig {
    /// Lifetime of the "message sent" marker
    pub fn sent_marker_ttl(&self) -> Duration {
        Duration::from_secs(self.sent_marker_ttl_secs)
    }
}

/// Resolve a credential from an environment variable
pub fn resolve_credential(credential_ref: &str) -> Result<String> {
    match std::env::var(credential_ref) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Config(format!(
            "Failed to resolve Twilio credential from env var: {}",
            credential_ref
        ))),
    }
}
