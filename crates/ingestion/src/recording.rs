//! Recording feed - replays events captured in a JSON Lines file

use std::path::PathBuf;

use async_channel::Sender;
use contracts::{ForwarderError, Message};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// One event notification per line; blank lines are ignored
#[derive(Debug, Clone)]
pub struct RecordingFeed {
    /// Recording file
    pub path: PathBuf,

    /// Channel filled in for events that carry none
    pub channel: Option<String>,
}

impl RecordingFeed {
    pub fn new(path: impl Into<PathBuf>, channel: Option<String>) -> Self {
        Self {
            path: path.into(),
            channel,
        }
    }

    /// Read and parse the recording
    ///
    /// Malformed lines are skipped with a warning.
    pub async fn load(&self, source_name: &str) -> Result<Vec<Message>, ForwarderError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ForwarderError::source(
                source_name,
                format!("failed to read recording '{}': {e}", self.path.display()),
            )
        })?;

        let mut messages = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(value) => messages.push(self.with_channel(value)),
                Err(e) => warn!(
                    source = source_name,
                    path = %self.path.display(),
                    line = idx + 1,
                    error = %e,
                    "Skipping malformed event"
                ),
            }
        }

        debug!(source = source_name, events = messages.len(), "recording loaded");
        Ok(messages)
    }

    fn with_channel(&self, mut value: Value) -> Message {
        if let (Some(channel), Some(object)) = (&self.channel, value.as_object_mut()) {
            object
                .entry("channel")
                .or_insert_with(|| Value::String(channel.clone()));
        }
        Message::new(value)
    }

    /// Push `messages` into `tx`, dropping the sender when done
    pub fn spawn(messages: Vec<Message>, tx: Sender<Message>) -> JoinHandle<()> {
        tokio::spawn(async move {
            for message in messages {
                if tx.send(message).await.is_err() {
                    debug!("recording feed channel closed");
                    return;
                }
            }
        })
    }
}
