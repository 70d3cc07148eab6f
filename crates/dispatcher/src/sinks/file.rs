//! FileSink - appends deliveries to a JSON Lines file

use std::path::{Path, PathBuf};

use contracts::{ForwarderError, Message, MessageProperties, MessageSink};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, instrument};

use crate::envelope::{DeclaredExchanges, Delivery};

/// Sink that appends one JSON line per delivery
pub struct FileSink {
    name: String,
    path: PathBuf,
    exchanges: DeclaredExchanges,
    file: Mutex<Option<File>>,
}

impl FileSink {
    /// Open (or create) the output file, creating parent directories
    pub async fn new(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        exchanges: DeclaredExchanges,
    ) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path).await?;

        Ok(Self {
            name: name.into(),
            path,
            exchanges,
            file: Mutex::new(Some(file)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, line: &[u8]) -> std::io::Result<()> {
        let mut guard = self.file.lock().await;
        let file = guard
            .as_mut()
            .ok_or_else(|| std::io::Error::other("file sink is closed"))?;
        file.write_all(line).await?;
        file.write_all(b"\n").await?;
        file.flush().await
    }
}

impl MessageSink for FileSink {
    #[instrument(
        name = "file_sink_consume",
        skip(self, message, properties),
        fields(sink = %self.name)
    )]
    async fn consume_message(
        &self,
        message: &Message,
        destination: &str,
        exchange: &str,
        routing_key: &str,
        properties: Option<&MessageProperties>,
    ) -> Result<(), ForwarderError> {
        self.exchanges.check(&self.name, exchange)?;
        let line = Delivery::new(message, destination, exchange, routing_key, properties).to_json()?;

        self.append(&line).await.map_err(|e| {
            error!(sink = %self.name, error = %e, "Write failed");
            ForwarderError::sink(format!("destination '{}' write error: {e}", self.name))
        })?;

        debug!(sink = %self.name, bytes = line.len(), "Delivery written");
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&self) -> Result<(), ForwarderError> {
        let file = self.file.lock().await.take();
        if let Some(mut file) = file {
            file.flush().await?;
            file.sync_all().await?;
            debug!(sink = %self.name, path = %self.path.display(), "FileSink closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_file_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("archive.jsonl");
        let sink = FileSink::new("archive", &path, DeclaredExchanges::new(["events"]))
            .await
            .unwrap();

        for id in 1..=2 {
            let message = Message::new(json!({ "data": { "event": { "replayId": id } } }));
            sink.consume_message(&message, "archive", "events", "cases", None)
                .await
                .unwrap();
        }
        sink.close().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["body"]["data"]["event"]["replayId"], json!(2));
        assert_eq!(lines[0]["routing_key"], json!("cases"));
        assert_eq!(lines[0]["properties"]["content_type"], json!("application/json"));
    }

    #[tokio::test]
    async fn test_file_sink_write_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        let sink = FileSink::new("archive", &path, DeclaredExchanges::new(["events"]))
            .await
            .unwrap();
        sink.close().await.unwrap();
        sink.close().await.unwrap();

        let message = Message::new(json!({}));
        let err = sink
            .consume_message(&message, "archive", "events", "k", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("closed"));
    }
}
