//! Forwarding lifecycle callbacks
//!
//! The engine reports every per-message outcome through a
//! [`ForwardingObserver`]. [`TracingObserver`] writes structured `tracing`
//! events and Prometheus metrics.

use std::time::{Duration, Instant};

use contracts::{ForwarderError, Message, ReplayMarker, Route};
use tracing::{error, info, warn};

use crate::EngineState;

/// What the engine remembers about a message while its delivery runs
#[derive(Debug, Clone)]
pub struct DeliveryContext {
    pub source_id: String,
    pub channel: Option<String>,
    pub replay_id: Option<ReplayMarker>,
    started: Instant,
}

impl DeliveryContext {
    pub fn new(source_id: &str, message: &Message) -> Self {
        Self {
            source_id: source_id.to_string(),
            channel: message.channel().map(str::to_string),
            replay_id: message.replay_id(),
            started: Instant::now(),
        }
    }

    /// Time since the message was dispatched
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Receives engine events
pub trait ForwardingObserver: Send + Sync {
    fn on_state_change(&self, _state: EngineState) {}

    fn on_in_flight(&self, _count: usize) {}

    fn on_received(&self, source_id: &str, message: &Message);

    fn on_forwarded(&self, delivery: &DeliveryContext, route: &Route);

    fn on_dropped(&self, delivery: &DeliveryContext);

    /// `ignored` is true when the policy keeps the engine running
    fn on_sink_error(&self, delivery: &DeliveryContext, error: &ForwarderError, ignored: bool);

    /// Unexpected failure of a forwarding task, panics included
    fn on_task_failure(&self, delivery: &DeliveryContext, reason: &str);
}

/// Default observer: structured logs and metrics
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ForwardingObserver for TracingObserver {
    fn on_state_change(&self, state: EngineState) {
        info!(state = %state, "Forwarding engine state changed");
    }

    fn on_in_flight(&self, count: usize) {
        observability::record_in_flight(count);
    }

    fn on_received(&self, source_id: &str, _message: &Message) {
        observability::record_message_received(source_id);
    }

    fn on_forwarded(&self, delivery: &DeliveryContext, route: &Route) {
        let elapsed_ms = delivery.elapsed().as_secs_f64() * 1000.0;
        observability::record_message_forwarded(&route.destination, elapsed_ms);
        info!(
            replay_id = ?delivery.replay_id,
            channel = delivery.channel.as_deref().unwrap_or_default(),
            source = %delivery.source_id,
            destination = %route.destination,
            exchange = %route.exchange,
            routing_key = %route.routing_key,
            elapsed_ms = format!("{:.2}", elapsed_ms),
            "Message forwarded"
        );
    }

    fn on_dropped(&self, delivery: &DeliveryContext) {
        observability::record_message_dropped(&delivery.source_id);
        warn!(
            replay_id = ?delivery.replay_id,
            channel = delivery.channel.as_deref().unwrap_or_default(),
            source = %delivery.source_id,
            "Message dropped, no route"
        );
    }

    fn on_sink_error(&self, delivery: &DeliveryContext, error: &ForwarderError, ignored: bool) {
        observability::record_sink_error();
        error!(
            replay_id = ?delivery.replay_id,
            channel = delivery.channel.as_deref().unwrap_or_default(),
            source = %delivery.source_id,
            error = %error,
            ignored,
            "Failed to forward message"
        );
    }

    fn on_task_failure(&self, delivery: &DeliveryContext, reason: &str) {
        observability::record_task_failure();
        error!(
            replay_id = ?delivery.replay_id,
            channel = delivery.channel.as_deref().unwrap_or_default(),
            source = %delivery.source_id,
            reason,
            "Forwarding task failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_delivery_context_from_message() {
        let message = Message::new(json!({
            "channel": "/topic/Cases",
            "data": { "event": { "replayId": 42 } }
        }));
        let delivery = DeliveryContext::new("org1", &message);

        assert_eq!(delivery.source_id, "org1");
        assert_eq!(delivery.channel.as_deref(), Some("/topic/Cases"));
        assert_eq!(delivery.replay_id, Some(42));
    }

    #[test]
    fn test_tracing_observer_without_subscriber() {
        let observer = TracingObserver;
        let message = Message::new(json!({}));
        let delivery = DeliveryContext::new("org1", &message);

        observer.on_received("org1", &message);
        observer.on_forwarded(&delivery, &Route::new("broker1", "events", "k"));
        observer.on_dropped(&delivery);
        observer.on_sink_error(&delivery, &ForwarderError::sink("boom"), true);
        observer.on_task_failure(&delivery, "panicked");
        observer.on_state_change(EngineState::Stopped);
    }
}
