//! Message & Route - data flowing between Source, Router and Sink
//!
//! A `Message` is an opaque JSON document. The forwarding path only reads
//! the fields it needs for routing and diagnostics, it never mutates one.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ForwarderError;

/// Replay cursor of a subscription event
pub type ReplayMarker = i64;

/// Delivery properties attached to a route (`delivery_mode`, `headers`, ...)
pub type MessageProperties = Map<String, Value>;

/// JSON pointer of the replay id inside an event notification
const REPLAY_ID_POINTER: &str = "/data/event/replayId";

/// Event notification received from a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Value);

impl Message {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Borrow the underlying document
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Subscription channel the event was published on
    pub fn channel(&self) -> Option<&str> {
        self.0.get("channel").and_then(Value::as_str)
    }

    /// Replay id (`data.event.replayId`)
    pub fn replay_id(&self) -> Option<ReplayMarker> {
        self.0.pointer(REPLAY_ID_POINTER).and_then(Value::as_i64)
    }

    /// Serialize to UTF-8 JSON
    pub fn to_bytes(&self) -> Result<Bytes, ForwarderError> {
        serde_json::to_vec(&self.0)
            .map(Bytes::from)
            .map_err(|e| ForwarderError::Other(format!("message serialize error: {e}")))
    }
}

impl From<Value> for Message {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Where a message goes: destination, exchange, routing key and delivery properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Destination (broker) name
    pub destination: String,

    /// Exchange on the destination
    pub exchange: String,

    /// Routing key used for publishing
    pub routing_key: String,

    /// Optional delivery properties. `content_type` and `content_encoding`
    /// are overwritten by the sink.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<MessageProperties>,
}

impl Route {
    pub fn new(
        destination: impl Into<String>,
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Self {
        Self {
            destination: destination.into(),
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            properties: None,
        }
    }

    /// Attach delivery properties
    pub fn with_properties(mut self, properties: MessageProperties) -> Self {
        self.properties = Some(properties);
        self
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.destination, self.exchange, self.routing_key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_accessors() {
        let message = Message::new(json!({
            "channel": "/topic/Cases",
            "data": { "event": { "replayId": 42 }, "sobject": { "Id": "5001" } }
        }));

        assert_eq!(message.channel(), Some("/topic/Cases"));
        assert_eq!(message.replay_id(), Some(42));
    }

    #[test]
    fn test_message_without_identifier() {
        let message = Message::new(json!({ "payload": "x" }));
        assert_eq!(message.channel(), None);
        assert_eq!(message.replay_id(), None);
    }

    #[test]
    fn test_message_serializes_transparently() {
        let message = Message::new(json!({ "channel": "c" }));
        let bytes = message.to_bytes().unwrap();
        assert_eq!(&bytes[..], br#"{"channel":"c"}"#);
    }

    #[test]
    fn test_route_from_toml_like_value() {
        let route: Route = serde_json::from_value(json!({
            "destination": "broker1",
            "exchange": "events",
            "routing_key": "cases",
            "properties": { "delivery_mode": 2 }
        }))
        .unwrap();

        assert_eq!(route.destination, "broker1");
        assert_eq!(route.to_string(), "broker1/events/cases");
        assert_eq!(route.properties.unwrap()["delivery_mode"], json!(2));
    }
}
