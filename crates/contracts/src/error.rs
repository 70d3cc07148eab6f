//! Layered error definitions
//!
//! Categorized by source: config / routing / source / sink / replay storage

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ForwarderError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Routing Errors =====
    /// Routing condition failed to compile
    #[error("invalid routing condition '{expression}': {message}")]
    InvalidRoutingCondition { expression: String, message: String },

    // ===== Source Errors =====
    /// Message source transport error
    #[error("message source '{source_name}' error: {message}")]
    MessageSource {
        source_name: String,
        message: String,
    },

    /// Operation not valid in the current state (e.g. receiving from an exhausted source)
    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },

    // ===== Sink Errors =====
    /// Delivery failure, uniform across destinations
    #[error("message sink error: {message}")]
    MessageSink { message: String },

    /// Transport level network failure
    #[error("network error: {message}")]
    Network { message: String },

    // ===== Replay Storage Errors =====
    /// Replay marker storage failure
    #[error("replay storage error: {message}")]
    ReplayStorage { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ForwarderError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid routing condition error
    pub fn invalid_condition(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRoutingCondition {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Create message source error
    pub fn source(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MessageSource {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create invalid operation error
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create message sink error
    pub fn sink(message: impl Into<String>) -> Self {
        Self::MessageSink {
            message: message.into(),
        }
    }

    /// Create network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create replay storage error
    pub fn replay_storage(message: impl Into<String>) -> Self {
        Self::ReplayStorage {
            message: message.into(),
        }
    }

    /// Whether this error belongs to the configuration category
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse { .. }
                | Self::ConfigValidation { .. }
                | Self::InvalidRoutingCondition { .. }
        )
    }

    /// Whether this error is the terminal "nothing left to receive" signal of a source
    pub fn is_invalid_operation(&self) -> bool {
        matches!(self, Self::InvalidOperation { .. })
    }

    /// Whether this error is a delivery failure raised by a sink
    pub fn is_sink_error(&self) -> bool {
        matches!(self, Self::MessageSink { .. })
    }
}
