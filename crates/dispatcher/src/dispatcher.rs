//! MultiMessageSink - fan-out to named destinations
//!
//! Destinations are built once from configuration. Each delivery is looked
//! up by destination name; failures of any kind surface as
//! `ForwarderError::MessageSink`.

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{
    DestinationConfig, ForwarderError, Message, MessageProperties, MessageSink, SinkConfig,
    TransportConfig,
};
use tracing::{debug, info, instrument, warn};

use crate::envelope::DeclaredExchanges;
use crate::metrics::{MetricsSnapshot, SinkMetrics};
use crate::sinks::{FileSink, LogSink, NetworkSink, NetworkSinkConfig};

/// Destination selected by configuration
pub enum AnySink {
    Log(LogSink),
    File(FileSink),
    Network(NetworkSink),
}

impl AnySink {
    /// Create a destination from configuration, declaring its exchanges
    #[instrument(
        name = "dispatcher_create_sink",
        skip(config),
        fields(transport = config.transport.kind())
    )]
    pub async fn from_config(name: &str, config: &DestinationConfig) -> Result<Self, ForwarderError> {
        let exchanges = DeclaredExchanges::from_config(&config.exchanges);
        for exchange in &config.exchanges {
            debug!(
                destination = name,
                exchange = %exchange.name,
                kind = ?exchange.kind,
                durable = exchange.durable,
                "Exchange declared"
            );
        }

        match &config.transport {
            TransportConfig::Log => Ok(Self::Log(LogSink::new(name, exchanges))),
            TransportConfig::File { path } => FileSink::new(name, path, exchanges)
                .await
                .map(Self::File)
                .map_err(|e| {
                    ForwarderError::sink(format!("failed to create destination '{name}': {e}"))
                }),
            TransportConfig::Udp {
                addr,
                max_datagram_size,
            } => {
                let config = NetworkSinkConfig::new(addr, *max_datagram_size)?;
                NetworkSink::new(name, config, exchanges)
                    .await
                    .map(Self::Network)
            }
        }
    }
}

impl MessageSink for AnySink {
    async fn consume_message(
        &self,
        message: &Message,
        destination: &str,
        exchange: &str,
        routing_key: &str,
        properties: Option<&MessageProperties>,
    ) -> Result<(), ForwarderError> {
        match self {
            Self::Log(sink) => {
                sink.consume_message(message, destination, exchange, routing_key, properties)
                    .await
            }
            Self::File(sink) => {
                sink.consume_message(message, destination, exchange, routing_key, properties)
                    .await
            }
            Self::Network(sink) => {
                sink.consume_message(message, destination, exchange, routing_key, properties)
                    .await
            }
        }
    }

    async fn close(&self) -> Result<(), ForwarderError> {
        match self {
            Self::Log(sink) => sink.close().await,
            Self::File(sink) => sink.close().await,
            Self::Network(sink) => sink.close().await,
        }
    }
}

/// Named destinations behind one sink
pub struct MultiMessageSink<K> {
    sinks: HashMap<String, K>,
    metrics: HashMap<String, Arc<SinkMetrics>>,
}

impl<K: MessageSink> MultiMessageSink<K> {
    pub fn new(sinks: HashMap<String, K>) -> Self {
        let metrics = sinks
            .keys()
            .map(|name| (name.clone(), Arc::new(SinkMetrics::new())))
            .collect();
        Self { sinks, metrics }
    }

    /// Destination names, sorted
    pub fn destinations(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.sinks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Get metrics for all destinations
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        let mut snapshots: Vec<_> = self
            .metrics
            .iter()
            .map(|(name, metrics)| (name.clone(), metrics.snapshot()))
            .collect();
        snapshots.sort_by(|a, b| a.0.cmp(&b.0));
        snapshots
    }
}

/// Map a destination failure onto the uniform sink error
fn into_sink_error(error: ForwarderError) -> ForwarderError {
    match error {
        ForwarderError::MessageSink { .. } => error,
        ForwarderError::Network { message } => ForwarderError::sink(format!("network error: {message}")),
        other => ForwarderError::sink(other.to_string()),
    }
}

impl<K: MessageSink + Sync> MessageSink for MultiMessageSink<K> {
    async fn consume_message(
        &self,
        message: &Message,
        destination: &str,
        exchange: &str,
        routing_key: &str,
        properties: Option<&MessageProperties>,
    ) -> Result<(), ForwarderError> {
        let sink = self.sinks.get(destination).ok_or_else(|| {
            ForwarderError::sink(format!("sink named '{destination}' doesn't exist"))
        })?;
        let metrics = self.metrics.get(destination);

        match sink
            .consume_message(message, destination, exchange, routing_key, properties)
            .await
        {
            Ok(()) => {
                if let Some(metrics) = metrics {
                    metrics.inc_delivered_count();
                }
                Ok(())
            }
            Err(e) => {
                if let Some(metrics) = metrics {
                    metrics.inc_failure_count();
                }
                Err(into_sink_error(e))
            }
        }
    }

    #[instrument(name = "dispatcher_close", skip(self), fields(destinations = self.sinks.len()))]
    async fn close(&self) -> Result<(), ForwarderError> {
        let mut first_error = None;
        for (name, sink) in &self.sinks {
            if let Err(e) = sink.close().await {
                warn!(destination = %name, error = %e, "Failed to close destination");
                first_error.get_or_insert(into_sink_error(e));
            }
        }
        info!("Dispatcher shutdown complete");
        first_error.map_or(Ok(()), Err)
    }
}

/// Create the composite sink from configuration
#[instrument(
    name = "dispatcher_create",
    skip(config),
    fields(destinations = config.destinations.len())
)]
pub async fn create_message_sink(config: &SinkConfig) -> Result<MultiMessageSink<AnySink>, ForwarderError> {
    let mut sinks = HashMap::with_capacity(config.destinations.len());
    for (name, destination) in &config.destinations {
        sinks.insert(name.clone(), AnySink::from_config(name, destination).await?);
    }
    Ok(MultiMessageSink::new(sinks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ExchangeConfig, ExchangeKind};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Mock sink for testing
    struct MockSink {
        count: Arc<AtomicU64>,
        fail_with: Option<fn() -> ForwarderError>,
        closed: Arc<AtomicU64>,
    }

    impl MockSink {
        fn new() -> Self {
            Self {
                count: Arc::new(AtomicU64::new(0)),
                fail_with: None,
                closed: Arc::new(AtomicU64::new(0)),
            }
        }
    }

    impl MessageSink for MockSink {
        async fn consume_message(
            &self,
            _message: &Message,
            _destination: &str,
            _exchange: &str,
            _routing_key: &str,
            _properties: Option<&MessageProperties>,
        ) -> Result<(), ForwarderError> {
            if let Some(fail) = self.fail_with {
                return Err(fail());
            }
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&self) -> Result<(), ForwarderError> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            match self.fail_with {
                Some(fail) => Err(fail()),
                None => Ok(()),
            }
        }
    }

    fn message() -> Message {
        Message::new(json!({ "channel": "/topic/A" }))
    }

    #[tokio::test]
    async fn test_routes_by_destination_name() {
        let broker1 = MockSink::new();
        let broker2 = MockSink::new();
        let (count1, count2) = (broker1.count.clone(), broker2.count.clone());

        let sink = MultiMessageSink::new(HashMap::from([
            ("broker1".to_string(), broker1),
            ("broker2".to_string(), broker2),
        ]));

        sink.consume_message(&message(), "broker2", "events", "k", None)
            .await
            .unwrap();

        assert_eq!(count1.load(Ordering::SeqCst), 0);
        assert_eq!(count2.load(Ordering::SeqCst), 1);
        assert_eq!(sink.metrics()[1].1.delivered_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_destination() {
        let sink = MultiMessageSink::new(HashMap::from([("broker1".to_string(), MockSink::new())]));

        let err = sink
            .consume_message(&message(), "broker2", "events", "k", None)
            .await
            .unwrap_err();
        assert!(err.is_sink_error());
        assert!(err.to_string().contains("broker2"), "got: {err}");
    }

    #[tokio::test]
    async fn test_network_error_is_wrapped() {
        let mut broker1 = MockSink::new();
        broker1.fail_with = Some(|| ForwarderError::network("connection reset"));
        let sink = MultiMessageSink::new(HashMap::from([("broker1".to_string(), broker1)]));

        let err = sink
            .consume_message(&message(), "broker1", "events", "k", None)
            .await
            .unwrap_err();
        assert!(err.is_sink_error());
        assert!(err.to_string().contains("network error: connection reset"), "got: {err}");
        assert_eq!(sink.metrics()[0].1.failure_count, 1);
    }

    #[tokio::test]
    async fn test_close_attempts_every_destination() {
        let mut failing = MockSink::new();
        failing.fail_with = Some(|| ForwarderError::network("gone"));
        let healthy = MockSink::new();
        let (closed_failing, closed_healthy) = (failing.closed.clone(), healthy.closed.clone());

        let sink = MultiMessageSink::new(HashMap::from([
            ("a".to_string(), failing),
            ("b".to_string(), healthy),
        ]));

        let err = sink.close().await.unwrap_err();
        assert!(err.is_sink_error());
        assert_eq!(closed_failing.load(Ordering::SeqCst), 1);
        assert_eq!(closed_healthy.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_create_message_sink_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let exchanges = vec![ExchangeConfig {
            name: "events".into(),
            kind: ExchangeKind::Topic,
            durable: true,
        }];
        let mut destinations = BTreeMap::new();
        destinations.insert(
            "log".to_string(),
            DestinationConfig {
                transport: TransportConfig::Log,
                exchanges: exchanges.clone(),
            },
        );
        destinations.insert(
            "archive".to_string(),
            DestinationConfig {
                transport: TransportConfig::File {
                    path: dir.path().join("archive.jsonl"),
                },
                exchanges,
            },
        );

        let sink = create_message_sink(&SinkConfig { destinations }).await.unwrap();
        assert_eq!(sink.destinations(), vec!["archive", "log"]);

        sink.consume_message(&message(), "archive", "events", "k", None)
            .await
            .unwrap();
        let err = sink
            .consume_message(&message(), "archive", "audit", "k", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not declared"));
        sink.close().await.unwrap();
    }
}
