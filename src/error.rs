//! Twilio driver error types

use thiserror::Error;

/// Driver error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Channel error
    #[error("Channel error: {0}")]
    Channel(String),

    /// Webhook signature could not be checked
    #[error("Signature error: {0}")]
    Signature(String),

    /// Network-level failure talking to the Messaging API
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The Messaging API rejected the request
    #[error("Twilio API error {status} (code {code:?}): {message}")]
    Provider {
        /// HTTP status returned by the API
        status: u16,
        /// Twilio error code, when the body carried one
        code: Option<i64>,
        /// Error message from the API
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the error came from the outbound send path.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Provider { .. })
    }
}

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Render an error as the JSON body returned by the HTTP layer.
pub fn to_json(err: &Error) -> serde_json::Value {
    serde_json::json!({ "error": err.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = Error::Provider {
            status: 400,
            code: Some(21211),
            message: "The 'To' number is not a valid phone number.".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("400"));
        assert!(text.contains("21211"));
        assert!(err.is_transport());
    }

    #[test]
    fn test_to_json() {
        let err = Error::Config("missing account_sid".to_string());
        let json = to_json(&err);
        assert_eq!(json["error"], "Configuration error: missing account_sid");
        assert!(!err.is_transport());
    }
}
