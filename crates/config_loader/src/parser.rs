//! 配置解析模块
//!
//! 支持 TOML (主要)、JSON 和 YAML 格式。

use contracts::{ForwarderConfig, ForwarderError};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
    /// YAML 格式 (`.yml` / `.yaml`)
    Yaml,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            "yml" | "yaml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<ForwarderConfig, ForwarderError> {
    toml::from_str(content).map_err(|e| ForwarderError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<ForwarderConfig, ForwarderError> {
    serde_json::from_str(content).map_err(|e| ForwarderError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 YAML 格式配置
pub fn parse_yaml(content: &str) -> Result<ForwarderConfig, ForwarderError> {
    serde_yaml::from_str(content).map_err(|e| ForwarderError::ConfigParse {
        message: format!("YAML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<ForwarderConfig, ForwarderError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
        ConfigFormat::Yaml => parse_yaml(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ReplayStorageConfig, SubscriptionConfig, TransportConfig};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[source.subscriptions.org1]
type = "mock"
channel = "/topic/Cases"

[sink.destinations.broker1]
type = "log"
exchanges = [{ name = "events" }]

[router.default_route]
destination = "broker1"
exchange = "events"
routing_key = "all"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.source.subscriptions.len(), 1);
        assert_eq!(config.source.buffer_size, 256);
        assert!(matches!(
            config.source.subscriptions["org1"],
            SubscriptionConfig::Mock { interval_ms: 1000, count: None, .. }
        ));
        assert_eq!(
            config.sink.destinations["broker1"].transport,
            TransportConfig::Log
        );
        assert!(config.router.rules.is_empty());
    }

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
[source]
buffer_size = 8

[source.replay]
type = "file"
path = "markers.json"
key_prefix = "fwd"

[source.subscriptions.org1]
type = "file"
path = "events/org1.jsonl"
channel = "/topic/Cases"

[sink.destinations.archive]
type = "udp"
addr = "127.0.0.1:9999"

[[sink.destinations.archive.exchanges]]
name = "archive"
kind = "fanout"
durable = true

[[router.rules]]
condition = "$[?@.source_id == 'org1']"
[router.rules.route]
destination = "archive"
exchange = "archive"
routing_key = "org1"
[router.rules.route.properties]
delivery_mode = 2
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.source.buffer_size, 8);
        assert_eq!(
            config.source.replay.as_ref().and_then(ReplayStorageConfig::key_prefix),
            Some("fwd")
        );
        assert_eq!(
            config.sink.destinations["archive"].transport,
            TransportConfig::Udp {
                addr: "127.0.0.1:9999".into(),
                max_datagram_size: 65000
            }
        );
        let rule = &config.router.rules[0];
        assert_eq!(rule.route.routing_key, "org1");
        assert_eq!(
            rule.route.properties.as_ref().unwrap()["delivery_mode"],
            serde_json::json!(2)
        );
        assert!(config.router.default_route.is_none());
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "source": {
                "subscriptions": {
                    "org1": { "type": "file", "path": "org1.jsonl" }
                }
            },
            "sink": {
                "destinations": {
                    "broker1": {
                        "type": "file",
                        "path": "out.jsonl",
                        "exchanges": [{ "name": "events", "kind": "direct" }]
                    }
                }
            },
            "router": { "default_route": null, "rules": [] }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
    }

    #[test]
    fn test_parse_yaml_minimal() {
        let content = r#"
source:
  replay:
    type: memory
    key_prefix: fwd
  subscriptions:
    org1:
      type: mock
      channel: /topic/Cases
      interval_ms: 50
sink:
  destinations:
    broker1:
      type: udp
      addr: "127.0.0.1:9999"
      exchanges:
        - name: events
          kind: topic
router:
  default_route:
    destination: broker1
    exchange: events
    routing_key: all
    properties:
      priority: 5
"#;
        let config = parse_yaml(content).unwrap();
        assert!(matches!(
            config.source.subscriptions["org1"],
            SubscriptionConfig::Mock { interval_ms: 50, .. }
        ));
        assert_eq!(
            config.source.replay.as_ref().and_then(ReplayStorageConfig::key_prefix),
            Some("fwd")
        );
        let route = config.router.default_route.unwrap();
        assert_eq!(route.properties.unwrap()["priority"], serde_json::json!(5));
    }

    #[test]
    fn test_parse_yaml_syntax_error() {
        let err = parse_yaml("source: [unclosed").unwrap_err();
        assert!(err.to_string().contains("YAML parse error"));
    }

    #[test]
    fn test_parse_unknown_transport() {
        let content = r#"
[source.subscriptions.org1]
type = "mock"
channel = "c"

[sink.destinations.broker1]
type = "carrier_pigeon"
"#;
        let result = parse_toml(content);
        assert!(matches!(result, Err(ForwarderError::ConfigParse { .. })));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ForwarderError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(
            ConfigFormat::from_extension("yml"),
            Some(ConfigFormat::Yaml)
        );
        assert_eq!(
            ConfigFormat::from_extension("yaml"),
            Some(ConfigFormat::Yaml)
        );
        assert_eq!(ConfigFormat::from_extension("ini"), None);
    }
}
