//! Transport abstraction for auth message exchange.

use crate::error::AuthError;
use crate::types::AuthMessage;

/// Handler invoked once per inbound message.
pub type MessageHandler = Box<dyn Fn(&AuthMessage) -> Result<(), AuthError> + Send + Sync>;

/// A duplex, framed, reliable message carrier.
///
/// Delivery is assumed in-order and loss-free; the core adds no retry or
/// reordering. `send` must be callable from any thread, including from
/// within an inbound handler.
pub trait Transport: Send + Sync {
    /// Send a message to the connected peer.
    fn send(&self, message: &AuthMessage) -> Result<(), AuthError>;

    /// Register the handler for inbound messages.
    fn on_data(&self, handler: MessageHandler) -> Result<(), AuthError>;
}
