//! Channel message drivers
//!
//! Provides the driver contract and the Twilio SMS/MMS driver that
//! receives webhook messages and sends replies.

mod adapter;
pub mod auth;
pub mod client;
mod event;
mod message;
mod twilio;

pub use adapter::{AdditionalParameters, DriverResponse, MessagingDriver, RequestMatch};
pub use auth::{AuthOutcome, ChannelAuth, TwilioAuth};
pub use client::{CreateMessage, MessageHandle, MessageTransport, TwilioClient};
pub use event::InboundEvent;
pub use message::{
    Answer, Attachment, Button, DriverEvent, InboundMedia, IncomingMessage, OutboundMessage,
    OutgoingMessage, OutgoingPayload, Question, User,
};
pub use twilio::{
    DriverContext, TwilioMessageDriver, DRIVER_NAME, SENT_MARKER_KEY, SENT_MARKER_VALUE,
};
