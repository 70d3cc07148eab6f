//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 端到端转发测试（录制文件 / mock 订阅 -> 路由 -> 文件目标）
//! - 错误策略与优雅关闭

#[cfg(test)]
mod contract_tests {
    use contracts::{ConfigVersion, ForwarderConfig, Message, Route};
    use serde_json::json;

    #[test]
    fn test_config_defaults_and_route_paths() {
        let config: ForwarderConfig = serde_json::from_value(json!({
            "source": { "subscriptions": {} },
            "sink": { "destinations": {} },
            "router": {
                "default_route": { "destination": "b", "exchange": "e", "routing_key": "all" },
                "rules": [{
                    "condition": "$[?@.source_id == 'org1']",
                    "route": { "destination": "b", "exchange": "e", "routing_key": "org1" }
                }]
            }
        }))
        .unwrap();

        assert_eq!(config.version, ConfigVersion::V1);
        assert_eq!(config.source.buffer_size, 256);
        let paths: Vec<_> = config
            .routes()
            .map(|(path, route)| (path, route.routing_key.clone()))
            .collect();
        assert_eq!(
            paths,
            vec![
                ("router.default_route".to_string(), "all".to_string()),
                ("router.rules[0].route".to_string(), "org1".to_string()),
            ]
        );
    }

    #[test]
    fn test_message_is_transparent_json() {
        let value = json!({ "channel": "/topic/Cases", "data": { "event": { "replayId": 5 } } });
        let message: Message = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(serde_json::to_value(&message).unwrap(), value);
        assert_eq!(message.replay_id(), Some(5));
    }

    #[test]
    fn test_route_wire_shape() {
        let route: Route = serde_json::from_value(json!({
            "destination": "broker1",
            "exchange": "events",
            "routing_key": "org1"
        }))
        .unwrap();
        assert_eq!(route, Route::new("broker1", "events", "org1"));
        assert!(route.properties.is_none());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::time::Duration;

    use application::{Application, ApplicationOptions, CancellationToken};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::ForwarderConfig;
    use serde_json::Value;

    fn load(toml: &str) -> ForwarderConfig {
        ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap()
    }

    fn write_recording(path: &Path, channel: &str, replay_ids: &[i64]) {
        let lines: Vec<String> = replay_ids
            .iter()
            .map(|id| {
                serde_json::json!({
                    "channel": channel,
                    "data": { "event": { "replayId": id }, "sobject": { "Id": format!("rec-{id}") } }
                })
                .to_string()
            })
            .collect();
        std::fs::write(path, lines.join("\n")).unwrap();
    }

    fn read_deliveries(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn toml_path(path: &Path) -> String {
        path.display().to_string().replace('\\', "/")
    }

    /// Two recorded subscriptions routed by source id into one file destination
    #[tokio::test]
    async fn test_e2e_recordings_to_file_destination() {
        let dir = tempfile::tempdir().unwrap();
        let org1 = dir.path().join("org1.jsonl");
        let org2 = dir.path().join("org2.jsonl");
        let out = dir.path().join("out/broker1.jsonl");
        write_recording(&org1, "/topic/Cases", &[1, 2, 3]);
        write_recording(&org2, "/topic/Leads", &[10, 11]);

        let config = load(&format!(
            r#"
[source.subscriptions.org1]
type = "file"
path = "{org1}"

[source.subscriptions.org2]
type = "file"
path = "{org2}"

[sink.destinations.broker1]
type = "file"
path = "{out}"
exchanges = [{{ name = "events" }}]

[sink.destinations.audit]
type = "log"
exchanges = [{{ name = "audit" }}]

[router.default_route]
destination = "broker1"
exchange = "events"
routing_key = "other"

[[router.rules]]
condition = "$[?@.source_id == 'org1']"
route = {{ destination = "broker1", exchange = "events", routing_key = "org1", properties = {{ priority = 5 }} }}
"#,
            org1 = toml_path(&org1),
            org2 = toml_path(&org2),
            out = toml_path(&out),
        ));

        let mut app = Application::new(config, ApplicationOptions::default());
        let stats = app.run(CancellationToken::new()).await.unwrap();

        assert_eq!(stats.received(), 5);
        assert_eq!(stats.forwarded(), 5);
        assert_eq!(stats.dropped(), 0);

        let deliveries = read_deliveries(&out);
        assert_eq!(deliveries.len(), 5);

        let org1_keys = deliveries
            .iter()
            .filter(|d| d["body"]["channel"] == "/topic/Cases")
            .filter(|d| d["routing_key"] == "org1")
            .count();
        assert_eq!(org1_keys, 3);

        for delivery in &deliveries {
            assert_eq!(delivery["properties"]["content_type"], "application/json");
            assert_eq!(delivery["properties"]["content_encoding"], "utf-8");
            if delivery["routing_key"] == "org1" {
                assert_eq!(delivery["properties"]["priority"], 5);
            } else {
                assert_eq!(delivery["routing_key"], "other");
            }
        }
    }

    const FAILING_TOML: &str = r#"
[source.subscriptions.org1]
type = "mock"
channel = "/topic/Cases"
interval_ms = 1
count = 3

[sink.destinations.broker1]
type = "udp"
addr = "127.0.0.1:9"
max_datagram_size = 16
exchanges = [{ name = "events" }]

[router.default_route]
destination = "broker1"
exchange = "events"
routing_key = "cases"
"#;

    /// Oversized datagrams fail every delivery
    #[tokio::test]
    async fn test_e2e_sink_errors_are_fatal_by_default() {
        let mut app = Application::new(load(FAILING_TOML), ApplicationOptions::default());
        let err = app.run(CancellationToken::new()).await.unwrap_err();

        assert!(err.is_sink_error());
        assert!(err.to_string().contains("network error"), "got: {err}");
    }

    #[tokio::test]
    async fn test_e2e_sink_errors_ignored_by_policy() {
        let options = ApplicationOptions {
            ignore_sink_errors: true,
            ..ApplicationOptions::default()
        };
        let mut app = Application::new(load(FAILING_TOML), options);
        let stats = app.run(CancellationToken::new()).await.unwrap();

        assert_eq!(stats.received(), 3);
        assert_eq!(stats.sink_errors(), 3);
        assert_eq!(stats.forwarded(), 0);
    }

    /// Cancelling an endless subscription drains what was received
    #[tokio::test]
    async fn test_e2e_graceful_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("broker1.jsonl");
        let config = load(&format!(
            r#"
[source.subscriptions.org1]
type = "mock"
channel = "/topic/Cases"
interval_ms = 5

[sink.destinations.broker1]
type = "file"
path = "{out}"
exchanges = [{{ name = "events" }}]

[router.default_route]
destination = "broker1"
exchange = "events"
routing_key = "cases"
"#,
            out = toml_path(&out),
        ));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                let mut app = Application::new(config, ApplicationOptions::default());
                app.run(shutdown).await
            }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();

        let stats = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("forwarder did not stop after cancellation")
            .unwrap()
            .unwrap();

        assert!(stats.received() > 0);
        assert_eq!(stats.forwarded(), stats.received());
        assert_eq!(read_deliveries(&out).len() as u64, stats.forwarded());
    }

    /// A second run resumes after the stored replay markers
    #[tokio::test]
    async fn test_e2e_replay_markers_resume() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("broker1.jsonl");
        let markers = dir.path().join("markers.json");
        let toml = format!(
            r#"
[source.subscriptions.org1]
type = "mock"
channel = "/topic/Cases"
interval_ms = 1
count = 3

[source.replay]
type = "file"
path = "{markers}"
key_prefix = "prod"

[sink.destinations.broker1]
type = "file"
path = "{out}"
exchanges = [{{ name = "events" }}]

[router.default_route]
destination = "broker1"
exchange = "events"
routing_key = "cases"
"#,
            markers = toml_path(&markers),
            out = toml_path(&out),
        );

        for _ in 0..2 {
            let mut app = Application::new(load(&toml), ApplicationOptions::default());
            let stats = app.run(CancellationToken::new()).await.unwrap();
            assert_eq!(stats.forwarded(), 3);
        }

        let mut replay_ids: Vec<i64> = read_deliveries(&out)
            .iter()
            .filter_map(|d| d["body"]["data"]["event"]["replayId"].as_i64())
            .collect();
        replay_ids.sort_unstable();
        assert_eq!(replay_ids, vec![1, 2, 3, 4, 5, 6]);

        let stored: Value = serde_json::from_str(&std::fs::read_to_string(&markers).unwrap()).unwrap();
        assert_eq!(stored["prod:org1:/topic/Cases"], 6);
    }
}
