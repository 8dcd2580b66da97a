//! Messaging API transport

use crate::config::TwilioConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Parameters of a Message-create call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateMessage {
    /// Destination number
    pub to: String,
    /// Sender number
    pub from: String,
    /// Message text
    pub body: String,
    /// Optional media URL (MMS)
    pub media_url: Option<String>,
}

/// A message resource returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageHandle {
    /// Message SID
    pub sid: String,
    /// Delivery status at creation time (usually `queued`)
    pub status: String,
    /// Destination number
    pub to: String,
    /// Sender number
    pub from: Option<String>,
}

/// Outbound message delivery
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Create (send) a message
    async fn create_message(&self, request: CreateMessage) -> Result<MessageHandle>;
}

/// Error body returned by the API on failure
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<i64>,
    message: String,
}

/// Twilio REST client for the Messages resource
pub struct TwilioClient {
    http: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioClient {
    /// Create a client from account configuration and a resolved auth token
    pub fn new(config: &TwilioConfig, auth_token: impl Into<String>) -> Result<Self> {
        if config.account_sid.is_empty() {
            return Err(Error::Config("twilio.account_sid is not set".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: auth_token.into(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }
}

#[async_trait]
impl MessageTransport for TwilioClient {
    async fn create_message(&self, request: CreateMessage) -> Result<MessageHandle> {
        let mut form = vec![
            ("To", request.to.as_str()),
            ("From", request.from.as_str()),
            ("Body", request.body.as_str()),
        ];
        if let Some(media_url) = request.media_url.as_deref() {
            form.push(("MediaUrl", media_url));
        }

        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let (code, message) = match serde_json::from_str::<ApiErrorBody>(&text) {
                Ok(body) => (body.code, body.message),
                Err(_) => (None, text),
            };
            return Err(Error::Provider {
                status: status.as_u16(),
                code,
                message,
            });
        }

        Ok(response.json::<MessageHandle>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".to_string(),
            from_number: "+15550000".to_string(),
            api_base_url: base_url.to_string(),
            ..Default::default()
        }
    }

    fn request() -> CreateMessage {
        CreateMessage {
            to: "+15550001".to_string(),
            from: "+15550000".to_string(),
            body: "Hi there".to_string(),
            media_url: None,
        }
    }

    #[test]
    fn test_requires_account_sid() {
        let config = TwilioConfig::default();
        assert!(matches!(
            TwilioClient::new(&config, "token"),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_create_message_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            // base64("AC123:token")
            .and(header("Authorization", "Basic QUMxMjM6dG9rZW4="))
            .and(body_string_contains("To=%2B15550001"))
            .and(body_string_contains("From=%2B15550000"))
            .and(body_string_contains("Body=Hi+there"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "sid": "SM42",
                "status": "queued",
                "to": "+15550001",
                "from": "+15550000",
                "body": "Hi there"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = TwilioClient::new(&test_config(&server.uri()), "token").unwrap();
        let handle = client.create_message(request()).await.unwrap();

        assert_eq!(handle.sid, "SM42");
        assert_eq!(handle.status, "queued");
        assert_eq!(handle.from.as_deref(), Some("+15550000"));
    }

    #[tokio::test]
    async fn test_create_message_with_media() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_string_contains("MediaUrl=http%3A%2F%2Fx%2Fimg.png"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "sid": "MM1",
                "status": "queued",
                "to": "+15550001",
                "from": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = TwilioClient::new(&test_config(&server.uri()), "token").unwrap();
        let handle = client
            .create_message(CreateMessage {
                media_url: Some("http://x/img.png".to_string()),
                ..request()
            })
            .await
            .unwrap();

        assert_eq!(handle.sid, "MM1");
        assert_eq!(handle.from, None);
    }

    #[tokio::test]
    async fn test_create_message_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": 21211,
                "message": "The 'To' number +15550001 is not a valid phone number.",
                "more_info": "https://www.twilio.com/docs/errors/21211",
                "status": 400
            })))
            .mount(&server)
            .await;

        let client = TwilioClient::new(&test_config(&server.uri()), "token").unwrap();
        let err = client.create_message(request()).await.unwrap_err();

        match err {
            Error::Provider {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code, Some(21211));
                assert!(message.contains("not a valid phone number"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_message_unparseable_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let client = TwilioClient::new(&test_config(&server.uri()), "token").unwrap();
        let err = client.create_message(request()).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Provider { status: 503, code: None, ref message } if message == "upstream unavailable"
        ));
    }

    #[tokio::test]
    async fn test_create_message_network_error() {
        // Nothing listens on port 9 on the loopback interface.
        let client = TwilioClient::new(&test_config("http://127.0.0.1:9"), "token").unwrap();
        let err = client.create_message(request()).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(err.is_transport());
    }
}
