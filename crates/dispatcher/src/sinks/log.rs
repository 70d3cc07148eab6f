//! LogSink - logs delivery summary via tracing

use contracts::{ForwarderError, Message, MessageProperties, MessageSink};
use tracing::{info, instrument};

use crate::envelope::{delivery_properties, DeclaredExchanges};

/// Sink that logs deliveries for debugging
pub struct LogSink {
    name: String,
    exchanges: DeclaredExchanges,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>, exchanges: DeclaredExchanges) -> Self {
        Self {
            name: name.into(),
            exchanges,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl MessageSink for LogSink {
    #[instrument(
        name = "log_sink_consume",
        skip(self, message, properties),
        fields(sink = %self.name)
    )]
    async fn consume_message(
        &self,
        message: &Message,
        _destination: &str,
        exchange: &str,
        routing_key: &str,
        properties: Option<&MessageProperties>,
    ) -> Result<(), ForwarderError> {
        self.exchanges.check(&self.name, exchange)?;
        let body = message.to_bytes()?;
        let properties = delivery_properties(properties);

        info!(
            sink = %self.name,
            exchange,
            routing_key,
            channel = message.channel().unwrap_or_default(),
            replay_id = message.replay_id(),
            bytes = body.len(),
            properties = properties.len(),
            "Message published"
        );
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&self) -> Result<(), ForwarderError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_log_sink_consume() {
        let sink = LogSink::new("test_log", DeclaredExchanges::new(["events"]));
        let message = Message::new(json!({ "channel": "/topic/A" }));

        let result = sink
            .consume_message(&message, "test_log", "events", "key", None)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_log_sink_rejects_undeclared_exchange() {
        let sink = LogSink::new("test_log", DeclaredExchanges::new(["events"]));
        let message = Message::new(json!({}));

        let err = sink
            .consume_message(&message, "test_log", "audit", "key", None)
            .await
            .unwrap_err();
        assert!(err.is_sink_error());
    }

    #[tokio::test]
    async fn test_log_sink_name() {
        let sink = LogSink::new("my_logger", DeclaredExchanges::default());
        assert_eq!(sink.name(), "my_logger");
        assert!(sink.close().await.is_ok());
    }
}
