//! MessageSource trait - input interface of the forwarding engine

use crate::{ForwarderError, Message};

/// Stream of `(source_id, message)` pairs
///
/// `close()` stops intake but keeps already buffered messages retrievable.
/// `get_message()` on a closed source without pending messages fails with
/// `ForwarderError::InvalidOperation`, which marks the source as exhausted.
#[trait_variant::make(MessageSource: Send)]
pub trait LocalMessageSource {
    /// True before the first `open()` and after `close()`
    fn is_closed(&self) -> bool;

    /// Number of received but not yet retrieved messages
    fn pending_count(&self) -> usize;

    /// Whether `pending_count() > 0`
    fn has_pending_messages(&self) -> bool;

    /// Start receiving messages
    ///
    /// # Errors
    /// `InvalidOperation` if already open, transport errors otherwise
    async fn open(&mut self) -> Result<(), ForwarderError>;

    /// Stop receiving new messages. Idempotent.
    async fn close(&mut self) -> Result<(), ForwarderError>;

    /// Wait for the next message
    ///
    /// Must be cancel-safe: dropping the returned future never loses a message.
    async fn get_message(&mut self) -> Result<(String, Message), ForwarderError>;
}
