//! MessageSink trait - output interface of the forwarding engine
//!
//! Defines the abstract interface for Sinks.

use crate::{ForwarderError, Message, MessageProperties};

/// Content type forced on every delivery
pub const CONTENT_TYPE: &str = "application/json";

/// Content encoding forced on every delivery
pub const CONTENT_ENCODING: &str = "utf-8";

/// Message delivery trait
///
/// Deliveries may run concurrently, so implementations take `&self` and
/// synchronize internally where needed.
#[trait_variant::make(MessageSink: Send)]
pub trait LocalMessageSink {
    /// Deliver `message` to `exchange` of `destination` with `routing_key`
    ///
    /// `content_type` / `content_encoding` in `properties` are overwritten
    /// with [`CONTENT_TYPE`] / [`CONTENT_ENCODING`].
    ///
    /// # Errors
    /// Returns delivery error (should include context)
    async fn consume_message(
        &self,
        message: &Message,
        destination: &str,
        exchange: &str,
        routing_key: &str,
        properties: Option<&MessageProperties>,
    ) -> Result<(), ForwarderError>;

    /// Release transport resources. Idempotent.
    async fn close(&self) -> Result<(), ForwarderError>;
}
