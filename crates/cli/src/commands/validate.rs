//! `validate` command implementation.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use contracts::ForwarderConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    subscription_count: usize,
    destination_count: usize,
    rule_count: usize,
    has_default_route: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Load, validate and compile routing conditions
    let loaded = config_loader::ConfigLoader::load_from_path(&args.config).and_then(|config| {
        application::create_router(&config.router)?;
        Ok(config)
    });

    match loaded {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    subscription_count: config.source.subscriptions.len(),
                    destination_count: config.sink.destinations.len(),
                    rule_count: config.router.rules.len(),
                    has_default_route: config.router.default_route.is_some(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &ForwarderConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.router.rules.is_empty() && config.router.default_route.is_none() {
        warnings.push("No routing rules and no default route - every message will be dropped".to_string());
    } else if config.router.default_route.is_none() {
        warnings.push("No default route - messages matching no rule will be dropped".to_string());
    }

    let routed: BTreeSet<&str> = config
        .routes()
        .map(|(_, route)| route.destination.as_str())
        .collect();
    for name in config.sink.destinations.keys() {
        if !routed.contains(name.as_str()) {
            warnings.push(format!("Destination '{}' is not referenced by any route", name));
        }
    }

    if config.source.replay.is_none() {
        warnings.push("No replay storage configured - restarts begin at the newest events".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("OK  Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Subscriptions: {}", summary.subscription_count);
            println!("  Destinations: {}", summary.destination_count);
            println!("  Rules: {}", summary.rule_count);
            println!("  Default route: {}", summary.has_default_route);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\nWarnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("ERR Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const CONFIG: &str = r#"
[source.subscriptions.org1]
type = "mock"
channel = "/topic/Cases"

[sink.destinations.broker1]
type = "log"
exchanges = [{ name = "events" }]

[sink.destinations.unused]
type = "log"
exchanges = [{ name = "events" }]

[[router.rules]]
condition = "$[?@.source_id == 'org1']"
route = { destination = "broker1", exchange = "events", routing_key = "org1" }
"#;

    fn args(path: &Path) -> ValidateArgs {
        ValidateArgs {
            config: path.to_path_buf(),
            json: true,
        }
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forwarder.toml");
        std::fs::write(&path, CONFIG).unwrap();

        let result = validate_config(&args(&path));
        assert!(result.valid, "error: {:?}", result.error);

        let summary = result.summary.unwrap();
        assert_eq!(summary.rule_count, 1);
        assert!(!summary.has_default_route);

        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("'unused'")));
        assert!(warnings.iter().any(|w| w.contains("No default route")));
    }

    #[test]
    fn test_invalid_condition() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forwarder.toml");
        std::fs::write(&path, CONFIG.replace("== 'org1']", "==")).unwrap();

        let result = validate_config(&args(&path));
        assert!(!result.valid);
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&args(Path::new("/nonexistent/forwarder.toml")));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }
}
