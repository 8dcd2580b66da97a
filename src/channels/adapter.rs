//! Channel driver contract

use super::message::{
    Answer, DriverEvent, IncomingMessage, OutgoingMessage, OutgoingPayload, User,
};
use crate::error::Result;
use crate::twiml::{self, MessagingResponse};
use async_trait::async_trait;

/// Parameters merged into a payload before the reply is serialized
pub type AdditionalParameters = serde_json::Map<String, serde_json::Value>;

/// Result of a classification check, keeping "wrong channel" apart from
/// "forged request"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestMatch {
    /// The request belongs to this channel and is authentic
    Matched,
    /// The request carries no marker of this channel
    NotThisChannel,
    /// The request looks like this channel but failed signature checks
    SignatureRejected {
        /// Why verification failed
        reason: String,
    },
}

impl RequestMatch {
    /// True only for [`RequestMatch::Matched`]
    pub fn is_match(&self) -> bool {
        matches!(self, RequestMatch::Matched)
    }
}

/// What the dispatcher hands back to the HTTP layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverResponse {
    /// HTTP status code
    pub status: u16,
    /// MIME type of `body`
    pub content_type: &'static str,
    /// Response body
    pub body: String,
}

impl DriverResponse {
    /// A 200 response carrying a TwiML document
    pub fn twiml(response: &MessagingResponse) -> Self {
        Self {
            status: 200,
            content_type: twiml::CONTENT_TYPE,
            body: response.to_xml(),
        }
    }

    /// A TwiML document with no verbs: acknowledges the webhook, sends nothing
    pub fn empty() -> Self {
        Self::twiml(&MessagingResponse::new())
    }
}

/// A messaging channel driver.
///
/// One driver instance serves one inbound request (or one detached send).
#[async_trait]
pub trait MessagingDriver: Send + Sync {
    /// Driver name
    fn name(&self) -> &str;

    /// Whether credentials needed for this driver are present
    fn is_configured(&self) -> bool;

    /// Classify the current request
    fn classify_request(&self) -> RequestMatch;

    /// Determine if the current request is for this driver
    fn matches_request(&self) -> bool {
        self.classify_request().is_match()
    }

    /// Messages carried by the current request
    fn get_messages(&self) -> &[IncomingMessage];

    /// User who sent `message`
    fn get_user(&self, message: &IncomingMessage) -> User;

    /// Wrap `message` as an answer to a pending question
    fn get_conversation_answer(&self, message: &IncomingMessage) -> Answer;

    /// Structured event carried by the current request, if any
    fn has_matching_event(&self) -> Option<DriverEvent>;

    /// Serialize a bot reply into the provider payload
    fn build_service_payload(
        &self,
        message: OutgoingMessage,
        matching_message: &IncomingMessage,
        additional_parameters: AdditionalParameters,
    ) -> OutgoingPayload;

    /// Deliver a payload
    async fn send_payload(&self, payload: &OutgoingPayload) -> Result<DriverResponse>;

    /// Serialize and deliver a reply to `matching_message`
    async fn reply(
        &self,
        message: OutgoingMessage,
        matching_message: &IncomingMessage,
        additional_parameters: AdditionalParameters,
    ) -> Result<DriverResponse> {
        let payload = self.build_service_payload(message, matching_message, additional_parameters);
        self.send_payload(&payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_match() {
        assert!(RequestMatch::Matched.is_match());
        assert!(!RequestMatch::NotThisChannel.is_match());
        assert!(!RequestMatch::SignatureRejected {
            reason: "invalid signature".to_string()
        }
        .is_match());
    }

    #[test]
    fn test_empty_response() {
        let response = DriverResponse::empty();
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "application/xml");
        assert!(response.body.ends_with("<Response/>"));
    }
}
