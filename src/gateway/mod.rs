//! Webhook gateway
//!
//! Hosts the Twilio messaging webhook over HTTP and hands each verified
//! inbound message to a [`ReplyHandler`].

mod handler;
mod server;

pub use handler::router;
pub use server::{EchoHandler, Gateway, GatewayBuilder, GatewayState, ReplyHandler};
