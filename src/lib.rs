//! Twilio Driver - SMS/MMS channel adapter for chatbots
//!
//! Receives Twilio messaging webhooks, verifies their signatures, normalizes
//! them into channel-neutral messages, and turns bot replies into either an
//! inline TwiML response or an outbound REST API call.
//!
//! ## Architecture
//!
//! ```text
//! Twilio ──POST webhook──▶ gateway ──▶ TwilioMessageDriver ──▶ ReplyHandler
//!                                          │ classify / normalize
//!                                          │ build payload
//!        ◀────── TwiML <Response> ─────────┤ (inline reply)
//!        ◀── POST Messages.json ───────────┘ (detached send)
//! ```
//!
//! ## Modules
//!
//! - [`channels`]: Driver contract, Twilio driver, signature auth and REST client
//! - [`gateway`]: HTTP webhook server
//! - [`twiml`]: TwiML MessagingResponse document builder
//! - [`cache`]: Expiring key-value store for sent markers
//! - [`config`]: Configuration management

pub mod cache;
pub mod channels;
pub mod config;
pub mod error;
pub mod gateway;
pub mod twiml;

pub use config::DriverConfig;
pub use error::{Error, Result};
