//! Webhook request authentication
//!
//! Provides a `ChannelAuth` trait that normalizes webhook signature
//! verification for channel drivers, and the Twilio implementation of it.
//!
//! Twilio signs every webhook with `X-Twilio-Signature`:
//! base64(HMAC-SHA1(auth_token, url + sorted(name + value)...)).
//! Webhooks that carry a `bodySHA256` query parameter are signed over the
//! URL alone and the body is bound through its SHA-256 digest instead.

use super::event::InboundEvent;
use base64::Engine;
use ring::hmac;
use sha2::{Digest, Sha256};

/// Header carrying the Twilio request signature (lowercase)
pub const SIGNATURE_HEADER: &str = "x-twilio-signature";

const BODY_HASH_PARAM: &str = "bodySHA256";

/// Outcome of a channel authentication check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Request is authenticated.
    Authenticated {
        /// Channel-specific identity (e.g., account SID).
        identity: String,
    },
    /// Request failed authentication.
    Rejected {
        /// Human-readable reason for rejection.
        reason: String,
    },
}

impl AuthOutcome {
    /// Returns true if the request is authenticated.
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated { .. })
    }

    fn rejected(reason: impl Into<String>) -> Self {
        AuthOutcome::Rejected {
            reason: reason.into(),
        }
    }
}

/// Channel authentication trait.
///
/// Implementors verify inbound webhook requests using platform-specific
/// signature schemes.
pub trait ChannelAuth: Send + Sync {
    /// Verify an inbound webhook request.
    fn verify_request(&self, event: &InboundEvent) -> AuthOutcome;

    /// Channel name for logging/audit.
    fn channel_name(&self) -> &str;
}

/// Twilio webhook signature verifier.
#[derive(Clone)]
pub struct TwilioAuth {
    account_sid: String,
    auth_token: String,
}

impl std::fmt::Debug for TwilioAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioAuth")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

impl TwilioAuth {
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
        }
    }

    /// Whether an auth token is available to check signatures with
    pub fn is_configured(&self) -> bool {
        !self.auth_token.is_empty()
    }

    /// Compute the signature Twilio would send for `url` and form `params`.
    pub fn compute_signature(&self, url: &str, params: &[(String, String)]) -> String {
        let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, self.auth_token.as_bytes());
        let tag = hmac::sign(&key, signing_string(url, params).as_bytes());
        base64::engine::general_purpose::STANDARD.encode(tag.as_ref())
    }
}

impl ChannelAuth for TwilioAuth {
    fn verify_request(&self, event: &InboundEvent) -> AuthOutcome {
        let signature = match event.header(SIGNATURE_HEADER) {
            Some(sig) => sig,
            None => return AuthOutcome::rejected("missing x-twilio-signature"),
        };
        if self.auth_token.is_empty() {
            return AuthOutcome::rejected("auth token not configured");
        }
        let expected = match base64::engine::general_purpose::STANDARD.decode(signature) {
            Ok(bytes) => bytes,
            Err(_) => return AuthOutcome::rejected("malformed signature"),
        };

        let body_hash = body_hash_param(event.url());
        let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, self.auth_token.as_bytes());

        // Twilio may sign with or without the default port.
        let mut candidates = vec![event.url().to_string()];
        candidates.extend(with_toggled_port(event.url()));

        let signed = candidates.iter().any(|url| {
            let data = match body_hash {
                Some(_) => url.clone(),
                None => signing_string(url, event.params()),
            };
            hmac::verify(&key, data.as_bytes(), &expected).is_ok()
        });
        if !signed {
            return AuthOutcome::rejected("invalid signature");
        }

        if let Some(hash) = body_hash {
            let computed = hex_encode(&Sha256::digest(event.body()));
            if !computed.eq_ignore_ascii_case(&hash) {
                return AuthOutcome::rejected("body hash mismatch");
            }
        }

        AuthOutcome::Authenticated {
            identity: self.account_sid.clone(),
        }
    }

    fn channel_name(&self) -> &str {
        "twilio"
    }
}

/// URL followed by every parameter name and value, sorted by name then value.
fn signing_string(url: &str, params: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();

    let mut data = url.to_string();
    for (name, value) in sorted {
        data.push_str(name);
        data.push_str(value);
    }
    data
}

fn body_hash_param(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == BODY_HASH_PARAM)
        .map(|(_, v)| v.into_owned())
}

/// The same URL with an explicit port removed, or the scheme's default port added.
fn with_toggled_port(url: &str) -> Option<String> {
    let (scheme, rest) = url.split_once("://")?;
    let default_port = match scheme {
        "https" => 443,
        "http" => 80,
        _ => return None,
    };

    let end = rest
        .find(|c: char| matches!(c, '/' | '?' | '#'))
        .unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(end);
    let host = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let userinfo = &authority[..authority.len() - host.len()];

    let port_sep = host.rfind(':').filter(|&i| !host[i..].contains(']'));
    let toggled = match port_sep {
        Some(i) => host[..i].to_string(),
        None => format!("{}:{}", host, default_port),
    };
    Some(format!("{}://{}{}{}", scheme, userinfo, toggled, tail))
}

/// Hex-encode bytes to lowercase hex string.
fn hex_encode(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://mycompany.com/myapp?foo=1&bar=2";

    fn sample_params() -> Vec<(&'static str, &'static str)> {
        vec![
            ("MessageSid", "SM1234567890ABCDE"),
            ("From", "+12349013030"),
            ("To", "+18005551212"),
            ("Body", "hello"),
        ]
    }

    fn sign(token: &str, data: &str) -> String {
        let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, token.as_bytes());
        let tag = hmac::sign(&key, data.as_bytes());
        base64::engine::general_purpose::STANDARD.encode(tag.as_ref())
    }

    #[test]
    fn test_signing_string_sorts_params() {
        let params: Vec<(String, String)> = [("To", "b"), ("Body", "x"), ("A", "2"), ("A", "1")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(signing_string("https://x", &params), "https://xA1A2BodyxTob");
    }

    #[test]
    fn test_valid_signature() {
        let auth = TwilioAuth::new("AC123", "12345");
        let expected = sign(
            "12345",
            "https://mycompany.com/myapp?foo=1&bar=2BodyhelloFrom+12349013030MessageSidSM1234567890ABCDETo+18005551212",
        );

        let event = InboundEvent::from_params(URL, sample_params())
            .with_header(SIGNATURE_HEADER, expected);
        let result = auth.verify_request(&event);
        assert!(result.is_allowed());
        assert!(matches!(result, AuthOutcome::Authenticated { identity } if identity == "AC123"));
    }

    #[test]
    fn test_compute_signature_matches_verifier() {
        let auth = TwilioAuth::new("AC123", "token");
        let event = InboundEvent::from_params(URL, sample_params());
        let signature = auth.compute_signature(URL, event.params());

        let event = event.with_header(SIGNATURE_HEADER, signature);
        assert!(auth.verify_request(&event).is_allowed());
    }

    #[test]
    fn test_invalid_signature() {
        let auth = TwilioAuth::new("AC123", "12345");
        let event = InboundEvent::from_params(URL, sample_params())
            .with_header(SIGNATURE_HEADER, sign("wrong-token", URL));
        assert_eq!(
            auth.verify_request(&event),
            AuthOutcome::Rejected {
                reason: "invalid signature".into()
            }
        );
    }

    #[test]
    fn test_tampered_param_rejected() {
        let auth = TwilioAuth::new("AC123", "12345");
        let signed = InboundEvent::from_params(URL, sample_params());
        let signature = auth.compute_signature(URL, signed.params());

        let tampered = InboundEvent::from_params(
            URL,
            [("MessageSid", "SM1234567890ABCDE"), ("From", "+12349013030"), ("To", "+18005551212"), ("Body", "HELLO")],
        )
        .with_header(SIGNATURE_HEADER, signature);
        assert!(!auth.verify_request(&tampered).is_allowed());
    }

    #[test]
    fn test_missing_header() {
        let auth = TwilioAuth::new("AC123", "12345");
        let event = InboundEvent::from_params(URL, sample_params());
        let result = auth.verify_request(&event);
        assert!(matches!(result, AuthOutcome::Rejected { reason } if reason.contains("x-twilio-signature")));
    }

    #[test]
    fn test_malformed_header() {
        let auth = TwilioAuth::new("AC123", "12345");
        let event = InboundEvent::from_params(URL, sample_params())
            .with_header(SIGNATURE_HEADER, "not base64!!");
        let result = auth.verify_request(&event);
        assert!(matches!(result, AuthOutcome::Rejected { reason } if reason.contains("malformed")));
    }

    #[test]
    fn test_empty_token_rejects() {
        let auth = TwilioAuth::new("AC123", "");
        let event = InboundEvent::from_params(URL, sample_params())
            .with_header(SIGNATURE_HEADER, sign("", URL));
        assert!(!auth.verify_request(&event).is_allowed());
    }

    #[test]
    fn test_signature_with_default_port() {
        let auth = TwilioAuth::new("AC123", "12345");
        let event = InboundEvent::from_params("https://mycompany.com/myapp", sample_params());
        let signature = auth.compute_signature("https://mycompany.com:443/myapp", event.params());

        let event = event.with_header(SIGNATURE_HEADER, signature);
        assert!(auth.verify_request(&event).is_allowed());
    }

    #[test]
    fn test_with_toggled_port() {
        assert_eq!(
            with_toggled_port("https://example.com/a?b=1").as_deref(),
            Some("https://example.com:443/a?b=1")
        );
        assert_eq!(
            with_toggled_port("http://user@example.com:8080").as_deref(),
            Some("http://user@example.com")
        );
        assert_eq!(
            with_toggled_port("http://[::1]/x").as_deref(),
            Some("http://[::1]:80/x")
        );
        assert_eq!(with_toggled_port("ftp://example.com"), None);
    }

    #[test]
    fn test_body_hash_signature() {
        let auth = TwilioAuth::new("AC123", "12345");
        let body = br#"{"MessageSid":"SM1"}"#;
        let hash = hex_encode(&Sha256::digest(body));
        let url = format!("https://mycompany.com/hook?{}={}", BODY_HASH_PARAM, hash);

        let event = InboundEvent::from_request(
            url.clone(),
            vec![
                ("content-type".to_string(), "application/json".to_string()),
                (SIGNATURE_HEADER.to_string(), sign("12345", &url)),
            ],
            bytes::Bytes::from_static(body),
        );
        assert!(auth.verify_request(&event).is_allowed());

        let forged = InboundEvent::from_request(
            url.clone(),
            vec![
                ("content-type".to_string(), "application/json".to_string()),
                (SIGNATURE_HEADER.to_string(), sign("12345", &url)),
            ],
            bytes::Bytes::from_static(br#"{"MessageSid":"SM2"}"#),
        );
        assert!(matches!(
            auth.verify_request(&forged),
            AuthOutcome::Rejected { reason } if reason.contains("body hash")
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let auth = TwilioAuth::new("AC123", "super-secret");
        let debug = format!("{:?}", auth);
        assert!(!debug.contains("super-secret"));
        assert_eq!(auth.channel_name(), "twilio");
    }
}
