//! Error types for CLI operations.

use contracts::ForwarderError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be loaded or compiled
    #[error("Invalid configuration: {0}")]
    Configuration(#[source] ForwarderError),

    /// Forwarding stopped on an unrecoverable error
    #[error("Forwarding failed: {0}")]
    Forwarding(#[source] ForwarderError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }
}

impl From<ForwarderError> for CliError {
    fn from(error: ForwarderError) -> Self {
        if error.is_configuration() {
            Self::Configuration(error)
        } else {
            Self::Forwarding(error)
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
