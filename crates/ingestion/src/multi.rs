//! MultiMessageSource - fan-in over several sources
//!
//! `get_message()` races one receive per active child and returns whichever
//! completes first. The other attempts are dropped before returning, which
//! cancels them; children must therefore be cancel-safe.

use contracts::{ForwarderError, Message, MessageSource};
use futures::future::select_all;
use tracing::{debug, instrument, warn};

/// Composite source
pub struct MultiMessageSource<S> {
    sources: Vec<S>,
    closed: bool,
}

impl<S: MessageSource> MultiMessageSource<S> {
    pub fn new(sources: Vec<S>) -> Self {
        Self {
            sources,
            closed: true,
        }
    }

    pub fn sources(&self) -> &[S] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// A child is worth waiting on while it can still yield messages
fn is_active<S: MessageSource>(source: &S) -> bool {
    !source.is_closed() || source.has_pending_messages()
}

impl<S: MessageSource> MessageSource for MultiMessageSource<S> {
    fn is_closed(&self) -> bool {
        self.closed
    }

    fn pending_count(&self) -> usize {
        self.sources.iter().map(MessageSource::pending_count).sum()
    }

    fn has_pending_messages(&self) -> bool {
        self.sources.iter().any(MessageSource::has_pending_messages)
    }

    #[instrument(name = "multi_source_open", skip(self), fields(sources = self.sources.len()))]
    async fn open(&mut self) -> Result<(), ForwarderError> {
        if !self.closed {
            return Err(ForwarderError::invalid_operation(
                "composite source is already open",
            ));
        }
        for idx in 0..self.sources.len() {
            if let Err(e) = self.sources[idx].open().await {
                // Roll back the children opened so far
                for opened in &mut self.sources[..idx] {
                    if let Err(close_error) = opened.close().await {
                        warn!(error = %close_error, "Failed to close message source");
                    }
                }
                return Err(e);
            }
        }
        self.closed = false;
        Ok(())
    }

    #[instrument(name = "multi_source_close", skip(self), fields(sources = self.sources.len()))]
    async fn close(&mut self) -> Result<(), ForwarderError> {
        self.closed = true;

        let mut first_error = None;
        for source in &mut self.sources {
            if let Err(e) = source.close().await {
                warn!(error = %e, "Failed to close message source");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn get_message(&mut self) -> Result<(String, Message), ForwarderError> {
        let mut exhausted = vec![false; self.sources.len()];

        loop {
            let (indices, attempts): (Vec<usize>, Vec<_>) = self
                .sources
                .iter_mut()
                .enumerate()
                .filter(|(idx, source)| !exhausted[*idx] && is_active(&**source))
                .map(|(idx, source)| (idx, Box::pin(source.get_message())))
                .unzip();

            if attempts.is_empty() {
                return Err(ForwarderError::invalid_operation(
                    "no active message sources",
                ));
            }

            let (result, winner, remaining) = select_all(attempts).await;
            drop(remaining);

            match result {
                // That child ran dry, keep waiting on the others
                Err(e) if e.is_invalid_operation() => {
                    debug!(error = %e, "Child source exhausted");
                    exhausted[indices[winner]] = true;
                }
                other => return other,
            }
        }
    }
}
