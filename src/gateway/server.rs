//! Webhook server implementation

use crate::cache::{CacheStore, MemoryCache};
use crate::channels::{
    DriverContext, IncomingMessage, MessageTransport, OutgoingMessage, TwilioClient,
};
use crate::config::DriverConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Produces the bot's reply to an inbound message
#[async_trait]
pub trait ReplyHandler: Send + Sync {
    /// Reply to `message`; `None` acknowledges without replying
    async fn handle(&self, message: &IncomingMessage) -> Result<Option<OutgoingMessage>>;
}

/// Replies with the inbound text
pub struct EchoHandler;

#[async_trait]
impl ReplyHandler for EchoHandler {
    async fn handle(&self, message: &IncomingMessage) -> Result<Option<OutgoingMessage>> {
        if message.text.is_empty() {
            return Ok(None);
        }
        Ok(Some(OutgoingMessage::Text(message.text.clone())))
    }
}

/// State shared by request handlers
pub struct GatewayState {
    pub(crate) config: DriverConfig,
    pub(crate) context: Arc<DriverContext>,
    pub(crate) handler: Arc<dyn ReplyHandler>,
}

impl GatewayState {
    /// Loaded configuration
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Driver context shared by every request
    pub fn context(&self) -> &Arc<DriverContext> {
        &self.context
    }
}

/// Webhook gateway
pub struct Gateway {
    state: Arc<GatewayState>,
}

impl Gateway {
    /// Shared state
    pub fn state(&self) -> &Arc<GatewayState> {
        &self.state
    }

    /// Build the HTTP router
    pub fn router(&self) -> axum::Router {
        super::handler::router(self.state.clone())
    }

    /// Bind and serve until Ctrl+C
    pub async fn serve(self) -> Result<()> {
        let gateway = &self.state.config.gateway;
        let addr = format!("{}:{}", gateway.host, gateway.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        tracing::info!(
            "Twilio driver listening on {} (webhook path {})",
            addr,
            gateway.webhook_path
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Twilio driver stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Builder for [`Gateway`]
#[derive(Default)]
pub struct GatewayBuilder {
    config: DriverConfig,
    host: Option<String>,
    port: Option<u16>,
    auth_token: Option<String>,
    transport: Option<Arc<dyn MessageTransport>>,
    cache: Option<Arc<dyn CacheStore>>,
    handler: Option<Arc<dyn ReplyHandler>>,
}

impl GatewayBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set configuration
    pub fn config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the bind host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Override the bind port
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Use this auth token instead of resolving it from the environment
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Use a custom message transport
    pub fn transport(mut self, transport: Arc<dyn MessageTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom cache store
    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the reply handler
    pub fn handler(mut self, handler: Arc<dyn ReplyHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Build the gateway
    pub fn build(self) -> Result<Gateway> {
        let mut config = self.config;
        if let Some(host) = self.host {
            config.gateway.host = host;
        }
        if let Some(port) = self.port {
            config.gateway.port = port;
        }
        if !config.gateway.webhook_path.starts_with('/') {
            return Err(Error::Config(format!(
                "gateway.webhook_path must start with '/': {}",
                config.gateway.webhook_path
            )));
        }

        let auth_token = match self.auth_token {
            Some(token) => token,
            None => config.twilio.resolve_auth_token()?,
        };
        let transport: Arc<dyn MessageTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(TwilioClient::new(&config.twilio, auth_token.clone())?),
        };
        let cache: Arc<dyn CacheStore> = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryCache::new()));
        let handler = self.handler.unwrap_or_else(|| Arc::new(EchoHandler));

        let context = Arc::new(DriverContext::new(&config, auth_token, transport, cache));

        Ok(Gateway {
            state: Arc::new(GatewayState {
                config,
                context,
                handler,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> DriverConfig {
        let mut config = DriverConfig::default();
        config.twilio.account_sid = "AC123".to_string();
        config.twilio.from_number = "+15550000".to_string();
        config
    }

    #[test]
    fn test_builder_overrides() {
        let gateway = GatewayBuilder::new()
            .config(test_config())
            .host("0.0.0.0")
            .port(9999)
            .auth_token("token")
            .build()
            .unwrap();

        assert_eq!(gateway.state().config().gateway.host, "0.0.0.0");
        assert_eq!(gateway.state().config().gateway.port, 9999);
        assert!(gateway.state().context().auth().is_configured());
    }

    #[test]
    fn test_builder_rejects_relative_path() {
        let mut config = test_config();
        config.gateway.webhook_path = "twilio".to_string();
        let result = GatewayBuilder::new().config(config).auth_token("token").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_requires_token() {
        let mut config = test_config();
        config.twilio.auth_token_ref = "TWILIO_DRIVER_TEST_UNSET_TOKEN".to_string();
        let result = GatewayBuilder::new().config(config).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_echo_handler() {
        let reply = EchoHandler
            .handle(&IncomingMessage::new("hi", "+1", "+2"))
            .await
            .unwrap();
        assert_eq!(reply, Some(OutgoingMessage::Text("hi".to_string())));

        let reply = EchoHandler
            .handle(&IncomingMessage::new("", "+1", "+2"))
            .await
            .unwrap();
        assert_eq!(reply, None);
    }
}
