//! Twilio SMS/MMS message driver

use super::adapter::{
    AdditionalParameters, DriverResponse, MessagingDriver, RequestMatch,
};
use super::auth::{AuthOutcome, ChannelAuth, TwilioAuth};
use super::client::{CreateMessage, MessageTransport, TwilioClient};
use super::event::InboundEvent;
use super::message::{
    Answer, Button, DriverEvent, InboundMedia, IncomingMessage, OutgoingMessage,
    OutgoingPayload, User,
};
use crate::cache::{CacheStore, MemoryCache};
use crate::config::DriverConfig;
use crate::error::Result;
use crate::twiml::{MessageVerb, MessagingResponse};
use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Driver name reported to the framework
pub const DRIVER_NAME: &str = "TwilioMessage";

/// Cache key of the "message sent" marker
pub const SENT_MARKER_KEY: &str = "message";

/// Cache value of the "message sent" marker
pub const SENT_MARKER_VALUE: &str = "sent";

/// Parameter whose presence marks a messaging webhook
const MESSAGE_SID: &str = "MessageSid";

/// State shared by every driver instance: credentials, transport and cache
pub struct DriverContext {
    account_sid: String,
    from_number: String,
    auth: TwilioAuth,
    transport: Arc<dyn MessageTransport>,
    cache: Arc<dyn CacheStore>,
    sent_marker_ttl: Duration,
}

impl DriverContext {
    /// Build the context from configuration and a resolved auth token
    pub fn new(
        config: &DriverConfig,
        auth_token: impl Into<String>,
        transport: Arc<dyn MessageTransport>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            account_sid: config.twilio.account_sid.clone(),
            from_number: config.twilio.from_number.clone(),
            auth: TwilioAuth::new(config.twilio.account_sid.clone(), auth_token),
            transport,
            cache,
            sent_marker_ttl: config.cache.sent_marker_ttl(),
        }
    }

    /// Build the context with the REST client and an in-memory cache,
    /// resolving the auth token from the environment
    pub fn from_config(config: &DriverConfig) -> Result<Self> {
        let auth_token = config.twilio.resolve_auth_token()?;
        let client = TwilioClient::new(&config.twilio, auth_token.clone())?;
        Ok(Self::new(
            config,
            auth_token,
            Arc::new(client),
            Arc::new(MemoryCache::new()),
        ))
    }

    /// Webhook signature verifier
    pub fn auth(&self) -> &TwilioAuth {
        &self.auth
    }

    /// Shared cache
    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }
}

/// Twilio message driver.
///
/// A driver built with [`TwilioMessageDriver::for_request`] answers inside the
/// webhook transaction with TwiML. One built with
/// [`TwilioMessageDriver::detached`] has no webhook to answer and sends
/// through the Messaging API instead.
pub struct TwilioMessageDriver {
    context: Arc<DriverContext>,
    event: Option<InboundEvent>,
    messages: OnceLock<Vec<IncomingMessage>>,
}

impl TwilioMessageDriver {
    /// Driver for an inbound webhook request
    pub fn for_request(context: Arc<DriverContext>, event: InboundEvent) -> Self {
        Self {
            context,
            event: Some(event),
            messages: OnceLock::new(),
        }
    }

    /// Driver used outside a webhook transaction (scheduled or CLI sends)
    pub fn detached(context: Arc<DriverContext>) -> Self {
        Self {
            context,
            event: None,
            messages: OnceLock::new(),
        }
    }

    /// The inbound event, if any
    pub fn event(&self) -> Option<&InboundEvent> {
        self.event.as_ref()
    }

    fn build_messages(&self) -> Vec<IncomingMessage> {
        let Some(event) = &self.event else {
            return Vec::new();
        };

        let field = |key: &str| event.get(key).unwrap_or_default().to_string();
        let mut message = IncomingMessage::new(field("Body"), field("From"), field("To"));
        message.message_sid = event.get(MESSAGE_SID).map(str::to_string);
        message.attachments = inbound_media(event);
        message.payload = event.to_json();

        vec![message]
    }

    async fn send_sms(&self, payload: &OutgoingPayload) -> Result<DriverResponse> {
        tracing::debug!(
            recipient = %payload.recipient,
            "Sending SMS through the Messaging API, no TwiML response"
        );

        self.context
            .cache
            .put(SENT_MARKER_KEY, SENT_MARKER_VALUE, self.context.sent_marker_ttl)
            .await?;

        let handle = self
            .context
            .transport
            .create_message(CreateMessage {
                to: payload.recipient.clone(),
                from: self.context.from_number.clone(),
                body: payload.text.clone(),
                media_url: payload.media.clone(),
            })
            .await?;

        tracing::debug!(sid = %handle.sid, status = %handle.status, "Message created");

        Ok(DriverResponse::empty())
    }
}

/// Media attached to an inbound MMS (`MediaUrl{N}` / `MediaContentType{N}`)
fn inbound_media(event: &InboundEvent) -> Vec<InboundMedia> {
    let count: usize = event
        .get("NumMedia")
        .and_then(|n| n.parse().ok())
        .unwrap_or(0);

    (0..count)
        .filter_map(|i| {
            let url = event.get(&format!("MediaUrl{}", i))?;
            Some(InboundMedia {
                url: url.to_string(),
                content_type: event
                    .get(&format!("MediaContentType{}", i))
                    .map(str::to_string),
            })
        })
        .collect()
}

/// Message body followed by one line per button label
fn markup_body(payload: &OutgoingPayload) -> String {
    let mut body = payload.text.clone();
    for button in &payload.buttons {
        body.push('\n');
        body.push_str(&button.text);
    }
    body
}

/// Seed a payload from caller-supplied parameters; recognized keys are
/// decoded, anything else is kept in `extra`.
fn payload_from_parameters(parameters: AdditionalParameters) -> OutgoingPayload {
    let mut payload = OutgoingPayload::default();
    for (key, value) in parameters {
        match key.as_str() {
            "text" => payload.text = value.as_str().unwrap_or_default().to_string(),
            "recipient" => payload.recipient = value.as_str().unwrap_or_default().to_string(),
            "media" => payload.media = value.as_str().map(str::to_string),
            "buttons" => {
                payload.buttons = serde_json::from_value::<Vec<Button>>(value).unwrap_or_default()
            }
            "twiml" => payload.twiml = serde_json::from_value::<MessagingResponse>(value).ok(),
            _ => {
                payload.extra.insert(key, value);
            }
        }
    }
    payload
}

#[async_trait]
impl MessagingDriver for TwilioMessageDriver {
    fn name(&self) -> &str {
        DRIVER_NAME
    }

    fn is_configured(&self) -> bool {
        !self.context.account_sid.is_empty()
            && !self.context.from_number.is_empty()
            && self.context.auth.is_configured()
    }

    fn classify_request(&self) -> RequestMatch {
        let Some(event) = &self.event else {
            return RequestMatch::NotThisChannel;
        };
        if !event.has(MESSAGE_SID) {
            return RequestMatch::NotThisChannel;
        }

        match self.context.auth.verify_request(event) {
            AuthOutcome::Authenticated { .. } => RequestMatch::Matched,
            AuthOutcome::Rejected { reason } => {
                tracing::warn!(
                    channel = self.context.auth.channel_name(),
                    url = event.url(),
                    reason = %reason,
                    "Rejected webhook with invalid signature"
                );
                RequestMatch::SignatureRejected { reason }
            }
        }
    }

    fn get_messages(&self) -> &[IncomingMessage] {
        self.messages.get_or_init(|| self.build_messages())
    }

    fn get_user(&self, message: &IncomingMessage) -> User {
        User {
            id: message.sender.clone(),
        }
    }

    fn get_conversation_answer(&self, message: &IncomingMessage) -> Answer {
        Answer {
            text: message.text.clone(),
            value: message.text.clone(),
            interactive_reply: true,
            message: message.clone(),
        }
    }

    fn has_matching_event(&self) -> Option<DriverEvent> {
        None
    }

    fn build_service_payload(
        &self,
        message: OutgoingMessage,
        matching_message: &IncomingMessage,
        additional_parameters: AdditionalParameters,
    ) -> OutgoingPayload {
        let mut payload = payload_from_parameters(additional_parameters);
        payload.buttons = Vec::new();

        let text = match message {
            OutgoingMessage::Question(question) => {
                payload.buttons = question.buttons;
                question.text
            }
            OutgoingMessage::Twiml(response) => {
                payload.twiml = Some(response);
                String::new()
            }
            OutgoingMessage::Message(outbound) => {
                if let Some(url) = outbound.attachment.as_ref().and_then(|a| a.url()) {
                    payload.media = Some(url.to_string());
                }
                outbound.text
            }
            OutgoingMessage::Text(text) => text,
        };

        payload.text = text;
        payload.recipient = matching_message.sender.clone();
        payload
    }

    async fn send_payload(&self, payload: &OutgoingPayload) -> Result<DriverResponse> {
        if self.event.is_none() {
            return self.send_sms(payload).await;
        }

        if let Some(twiml) = &payload.twiml {
            return Ok(DriverResponse::twiml(twiml));
        }

        let mut message = MessageVerb::new().with_body(markup_body(payload));
        if let Some(media) = &payload.media {
            message = message.with_media(media.clone());
        }
        let response = MessagingResponse::new().message(message);

        Ok(DriverResponse::twiml(&response))
    }
}
