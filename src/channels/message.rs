//! Canonical message model shared by channel drivers

use crate::twiml::MessagingResponse;
use serde::{Deserialize, Serialize};

/// A normalized inbound message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Message text
    pub text: String,
    /// Sender address (phone number)
    pub sender: String,
    /// Recipient address (the bot's number)
    pub recipient: String,
    /// Provider message identifier
    pub message_sid: Option<String>,
    /// Media attached to the inbound message (MMS)
    pub attachments: Vec<InboundMedia>,
    /// Receive time in Unix milliseconds
    pub received_at: i64,
    /// Raw webhook parameters
    pub payload: serde_json::Value,
}

impl IncomingMessage {
    /// Create a message with no media and an empty payload
    pub fn new(
        text: impl Into<String>,
        sender: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            sender: sender.into(),
            recipient: recipient.into(),
            message_sid: None,
            attachments: Vec::new(),
            received_at: chrono::Utc::now().timestamp_millis(),
            payload: serde_json::Value::Null,
        }
    }
}

/// Media received with an inbound MMS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMedia {
    /// Media URL hosted by the provider
    pub url: String,
    /// MIME type reported by the provider
    pub content_type: Option<String>,
}

/// An inbound message understood as a reply in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Raw answer text
    pub text: String,
    /// Resolved value
    pub value: String,
    /// Given in response to a previously asked question
    pub interactive_reply: bool,
    /// Message the answer was derived from
    pub message: IncomingMessage,
}

/// The user behind an inbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Channel-specific user identifier
    pub id: String,
}

/// A structured driver event distinct from plain messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverEvent {
    /// Event name
    pub name: String,
    /// Event payload
    pub payload: serde_json::Value,
}

/// A reply option attached to a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    /// Label shown to the user
    pub text: String,
    /// Value reported back when chosen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Button {
    /// Create a button with a label only
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: None,
        }
    }

    /// Set the reported value
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// A multiple-choice question
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Question text
    pub text: String,
    /// Answer options, in display order
    pub buttons: Vec<Button>,
}

impl Question {
    /// Create a question without buttons
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    /// Append an answer option
    pub fn add_button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }

    /// Append several answer options
    pub fn add_buttons(mut self, buttons: impl IntoIterator<Item = Button>) -> Self {
        self.buttons.extend(buttons);
        self
    }
}

/// An attachment on an outgoing message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Attachment {
    /// Image by URL
    Image { url: String },
    /// Video by URL
    Video { url: String },
    /// Audio by URL
    Audio { url: String },
    /// Generic file by URL
    File { url: String },
    /// Geographic location; SMS cannot carry it as media
    Location { latitude: f64, longitude: f64 },
}

impl Attachment {
    /// Media URL, `None` for locations
    pub fn url(&self) -> Option<&str> {
        match self {
            Attachment::Image { url }
            | Attachment::Video { url }
            | Attachment::Audio { url }
            | Attachment::File { url } => Some(url),
            Attachment::Location { .. } => None,
        }
    }

    /// Whether this is a location attachment
    pub fn is_location(&self) -> bool {
        matches!(self, Attachment::Location { .. })
    }
}

/// A generic outgoing message with an optional attachment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Message text
    pub text: String,
    /// Optional attachment
    pub attachment: Option<Attachment>,
}

impl OutboundMessage {
    /// Create a text-only message
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: None,
        }
    }

    /// Attach media or a location
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// Everything a bot can reply with
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingMessage {
    /// Plain text
    Text(String),
    /// Multiple-choice question
    Question(Question),
    /// Provider-native TwiML, returned verbatim
    Twiml(MessagingResponse),
    /// Generic message, possibly with an attachment
    Message(OutboundMessage),
}

impl From<&str> for OutgoingMessage {
    fn from(text: &str) -> Self {
        OutgoingMessage::Text(text.to_string())
    }
}

impl From<String> for OutgoingMessage {
    fn from(text: String) -> Self {
        OutgoingMessage::Text(text)
    }
}

impl From<Question> for OutgoingMessage {
    fn from(question: Question) -> Self {
        OutgoingMessage::Question(question)
    }
}

impl From<MessagingResponse> for OutgoingMessage {
    fn from(response: MessagingResponse) -> Self {
        OutgoingMessage::Twiml(response)
    }
}

impl From<OutboundMessage> for OutgoingMessage {
    fn from(message: OutboundMessage) -> Self {
        OutgoingMessage::Message(message)
    }
}

/// Provider payload produced by the reply serializer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutgoingPayload {
    /// Message text
    pub text: String,
    /// Question options, always present after serialization
    pub buttons: Vec<Button>,
    /// Media URL for MMS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    /// Destination address
    pub recipient: String,
    /// Raw TwiML that bypasses markup building
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twiml: Option<MessagingResponse>,
    /// Caller-supplied parameters with no dedicated field
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_url() {
        let image = Attachment::Image {
            url: "http://x/img.png".to_string(),
        };
        assert_eq!(image.url(), Some("http://x/img.png"));
        assert!(!image.is_location());

        let location = Attachment::Location {
            latitude: 52.52,
            longitude: 13.405,
        };
        assert_eq!(location.url(), None);
        assert!(location.is_location());
    }

    #[test]
    fn test_question_builder() {
        let question = Question::new("Continue?")
            .add_button(Button::new("Yes").value("yes"))
            .add_buttons([Button::new("No")]);

        assert_eq!(question.buttons.len(), 2);
        assert_eq!(question.buttons[0].value.as_deref(), Some("yes"));
        assert_eq!(question.buttons[1].text, "No");
    }

    #[test]
    fn test_outgoing_message_conversions() {
        assert_eq!(
            OutgoingMessage::from("hello"),
            OutgoingMessage::Text("hello".to_string())
        );
        assert!(matches!(
            OutgoingMessage::from(Question::new("?")),
            OutgoingMessage::Question(_)
        ));
        assert!(matches!(
            OutgoingMessage::from(MessagingResponse::new()),
            OutgoingMessage::Twiml(_)
        ));
        assert!(matches!(
            OutgoingMessage::from(OutboundMessage::new("hi")),
            OutgoingMessage::Message(_)
        ));
    }

    #[test]
    fn test_payload_serializes_extra_flat() {
        let mut payload = OutgoingPayload {
            text: "hi".to_string(),
            recipient: "+15550001".to_string(),
            ..Default::default()
        };
        payload
            .extra
            .insert("channel".to_string(), serde_json::json!("sms"));

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["text"], "hi");
        assert_eq!(json["buttons"], serde_json::json!([]));
        assert_eq!(json["channel"], "sms");
        assert!(json.get("media").is_none());
    }
}
