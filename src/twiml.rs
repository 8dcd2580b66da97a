//! TwiML messaging response documents
//!
//! A [`MessagingResponse`] is the markup Twilio expects back from a
//! messaging webhook. It is built from verbs and rendered to XML with
//! [`MessagingResponse::to_xml`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// MIME type for TwiML bodies
pub const CONTENT_TYPE: &str = "application/xml";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// A TwiML `<Response>` document for the Messaging API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagingResponse {
    verbs: Vec<Verb>,
}

/// A verb nested under `<Response>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verb", rename_all = "snake_case")]
pub enum Verb {
    /// `<Message>`: reply to the sender
    Message(MessageVerb),
    /// `<Redirect>`: hand control to another TwiML URL
    Redirect(Redirect),
}

/// The `<Message>` verb
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageVerb {
    body: Option<String>,
    media: Vec<String>,
    to: Option<String>,
    from: Option<String>,
    action: Option<String>,
}

/// The `<Redirect>` verb
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    url: String,
    method: Option<String>,
}

impl MessagingResponse {
    /// Create an empty response
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `<Message>` verb
    pub fn message(mut self, message: MessageVerb) -> Self {
        self.verbs.push(Verb::Message(message));
        self
    }

    /// Append a `<Redirect>` verb
    pub fn redirect(mut self, url: impl Into<String>, method: Option<&str>) -> Self {
        self.verbs.push(Verb::Redirect(Redirect {
            url: url.into(),
            method: method.map(str::to_string),
        }));
        self
    }

    /// All verbs in document order
    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    /// The `<Message>` verbs in document order
    pub fn messages(&self) -> impl Iterator<Item = &MessageVerb> {
        self.verbs.iter().filter_map(|verb| match verb {
            Verb::Message(message) => Some(message),
            Verb::Redirect(_) => None,
        })
    }

    /// True when the document has no verbs (Twilio sends nothing back)
    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }

    /// Render the document as XML
    pub fn to_xml(&self) -> String {
        let mut out = String::from(XML_DECLARATION);
        if self.verbs.is_empty() {
            out.push_str("<Response/>");
            return out;
        }

        out.push_str("<Response>");
        for verb in &self.verbs {
            match verb {
                Verb::Message(message) => message.write_xml(&mut out),
                Verb::Redirect(redirect) => redirect.write_xml(&mut out),
            }
        }
        out.push_str("</Response>");
        out
    }
}

impl fmt::Display for MessagingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml())
    }
}

impl MessageVerb {
    /// Create an empty message verb
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the message body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach a media URL (MMS)
    pub fn with_media(mut self, url: impl Into<String>) -> Self {
        self.media.push(url.into());
        self
    }

    /// Override the destination number
    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    /// Override the sender number
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Status callback URL
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Message body, if any
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Attached media URLs
    pub fn media(&self) -> &[String] {
        &self.media
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<Message");
        write_attr(out, "to", self.to.as_deref());
        write_attr(out, "from", self.from.as_deref());
        write_attr(out, "action", self.action.as_deref());

        if self.body.is_none() && self.media.is_empty() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        if let Some(body) = &self.body {
            out.push_str("<Body>");
            out.push_str(&escape_xml(body));
            out.push_str("</Body>");
        }
        for url in &self.media {
            out.push_str("<Media>");
            out.push_str(&escape_xml(url));
            out.push_str("</Media>");
        }
        out.push_str("</Message>");
    }
}

impl Redirect {
    /// Target URL
    pub fn url(&self) -> &str {
        &self.url
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<Redirect");
        write_attr(out, "method", self.method.as_deref());
        out.push('>');
        out.push_str(&escape_xml(&self.url));
        out.push_str("</Redirect>");
    }
}

fn write_attr(out: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_xml(value));
        out.push('"');
    }
}

fn escape_xml(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_response() {
        let response = MessagingResponse::new();
        assert!(response.is_empty());
        assert_eq!(
            response.to_xml(),
            r#"<?xml version="1.0" encoding="UTF-8"?><Response/>"#
        );
    }

    #[test]
    fn test_message_with_body_and_media() {
        let response = MessagingResponse::new().message(
            MessageVerb::new()
                .with_body("Hi\nA\nB")
                .with_media("http://x/img.png"),
        );

        assert_eq!(
            response.to_xml(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <Response><Message><Body>Hi\nA\nB</Body><Media>http://x/img.png</Media></Message></Response>"
        );
        let message = response.messages().next().unwrap();
        assert_eq!(message.body(), Some("Hi\nA\nB"));
        assert_eq!(message.media(), ["http://x/img.png".to_string()]);
    }

    #[test]
    fn test_escaping() {
        let response = MessagingResponse::new()
            .message(MessageVerb::new().with_body("<b>Tom & \"Jerry\"</b>").with_to("+1 'x'"));
        let xml = response.to_xml();
        assert!(xml.contains("<Body>&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;</Body>"));
        assert!(xml.contains(r#"<Message to="+1 &apos;x&apos;">"#));
    }

    #[test]
    fn test_redirect_and_bare_message() {
        let response = MessagingResponse::new()
            .message(MessageVerb::new())
            .redirect("https://example.com/next?a=1&b=2", Some("POST"));

        assert_eq!(response.verbs().len(), 2);
        assert_eq!(response.messages().count(), 1);
        assert!(response.to_xml().ends_with(
            r#"<Response><Message/><Redirect method="POST">https://example.com/next?a=1&amp;b=2</Redirect></Response>"#
        ));
    }

    #[test]
    fn test_display_matches_to_xml() {
        let response = MessagingResponse::new().message(MessageVerb::new().with_body("hello"));
        assert_eq!(response.to_string(), response.to_xml());
    }
}
