//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON/YAML configuration files
//! - Validate configuration legality
//! - Generate `ForwarderConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("forwarder.toml")).unwrap();
//! println!("Subscriptions: {}", config.source.subscriptions.len());
//! ```

mod parser;
mod validator;

pub use contracts::ForwarderConfig;
pub use parser::ConfigFormat;

use contracts::ForwarderError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json / .yml / .yaml).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<ForwarderConfig, ForwarderError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<ForwarderConfig, ForwarderError> {
        Self::parse_and_validate(content, format)
    }

    /// Serialize ForwarderConfig to TOML string
    pub fn to_toml(config: &ForwarderConfig) -> Result<String, ForwarderError> {
        toml::to_string_pretty(config)
            .map_err(|e| ForwarderError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize ForwarderConfig to JSON string
    pub fn to_json(config: &ForwarderConfig) -> Result<String, ForwarderError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ForwarderError::config_parse(format!("JSON serialize error: {e}")))
    }

    /// Serialize ForwarderConfig to YAML string
    pub fn to_yaml(config: &ForwarderConfig) -> Result<String, ForwarderError> {
        serde_yaml::to_string(config)
            .map_err(|e| ForwarderError::config_parse(format!("YAML serialize error: {e}")))
    }

    /// Serialize ForwarderConfig in the given format
    pub fn to_string(config: &ForwarderConfig, format: ConfigFormat) -> Result<String, ForwarderError> {
        match format {
            ConfigFormat::Toml => Self::to_toml(config),
            ConfigFormat::Json => Self::to_json(config),
            ConfigFormat::Yaml => Self::to_yaml(config),
        }
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ForwarderError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ForwarderError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ForwarderError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ForwarderError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<ForwarderConfig, ForwarderError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}
