//! Delivery envelope shared by the sinks

use std::collections::HashSet;

use contracts::{
    ExchangeConfig, ForwarderError, Message, MessageProperties, CONTENT_ENCODING, CONTENT_TYPE,
};
use serde::Serialize;
use serde_json::Value;

/// Route properties with `content_type` / `content_encoding` forced
pub fn delivery_properties(properties: Option<&MessageProperties>) -> MessageProperties {
    let mut merged = properties.cloned().unwrap_or_default();
    merged.insert("content_type".into(), Value::from(CONTENT_TYPE));
    merged.insert("content_encoding".into(), Value::from(CONTENT_ENCODING));
    merged
}

/// One published message as written by the file and network sinks
#[derive(Debug, Serialize)]
pub struct Delivery<'a> {
    /// RFC 3339 publish time
    pub timestamp: String,
    pub destination: &'a str,
    pub exchange: &'a str,
    pub routing_key: &'a str,
    pub properties: MessageProperties,
    pub body: &'a Message,
}

impl<'a> Delivery<'a> {
    pub fn new(
        message: &'a Message,
        destination: &'a str,
        exchange: &'a str,
        routing_key: &'a str,
        properties: Option<&MessageProperties>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            destination,
            exchange,
            routing_key,
            properties: delivery_properties(properties),
            body: message,
        }
    }

    /// Serialize as a single JSON line (without the trailing newline)
    pub fn to_json(&self) -> Result<Vec<u8>, ForwarderError> {
        serde_json::to_vec(self).map_err(|e| ForwarderError::sink(format!("serialize error: {e}")))
    }
}

/// Exchanges declared on a destination
#[derive(Debug, Clone, Default)]
pub struct DeclaredExchanges {
    names: HashSet<String>,
}

impl DeclaredExchanges {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(exchanges: &[ExchangeConfig]) -> Self {
        Self::new(exchanges.iter().map(|exchange| exchange.name.clone()))
    }

    /// Reject publishing to an exchange the destination never declared
    pub fn check(&self, destination: &str, exchange: &str) -> Result<(), ForwarderError> {
        if self.names.contains(exchange) {
            Ok(())
        } else {
            Err(ForwarderError::sink(format!(
                "exchange '{exchange}' is not declared on destination '{destination}'"
            )))
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
