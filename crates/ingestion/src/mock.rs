//! Mock 事件源
//!
//! 用于无远端订阅环境的测试，按固定间隔生成事件通知。

use std::time::Duration;

use async_channel::Sender;
use contracts::{Message, ReplayMarker};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Mock 事件源配置
#[derive(Debug, Clone)]
pub struct MockFeed {
    /// 订阅 channel
    pub channel: String,

    /// 发送间隔
    pub interval: Duration,

    /// 生成数量 (None = 无限)
    pub count: Option<u64>,
}

impl MockFeed {
    /// 创建新的 Mock 事件源
    pub fn new(channel: impl Into<String>, interval: Duration, count: Option<u64>) -> Self {
        Self {
            channel: channel.into(),
            interval,
            count,
        }
    }

    /// 生成 replay id 为 `replay_id` 的事件
    pub fn event(&self, replay_id: ReplayMarker) -> Message {
        Message::new(json!({
            "channel": self.channel,
            "data": {
                "event": {
                    "createdDate": chrono::Utc::now().to_rfc3339(),
                    "replayId": replay_id,
                    "type": "created"
                },
                "sobject": {
                    "Id": format!("mock-{replay_id}"),
                    "Sequence": replay_id
                }
            }
        }))
    }

    /// 启动生成任务
    ///
    /// replay id 从 `after + 1` 开始递增；接收端关闭或达到数量后退出。
    pub fn spawn(&self, tx: Sender<Message>, after: Option<ReplayMarker>) -> JoinHandle<()> {
        let feed = self.clone();
        let first = after.map_or(1, |marker| marker + 1);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(feed.interval);
            let mut sent: u64 = 0;

            debug!(channel = %feed.channel, first_replay_id = first, "mock feed started");

            loop {
                if feed.count.is_some_and(|count| sent >= count) {
                    break;
                }
                ticker.tick().await;

                let replay_id = first + sent as ReplayMarker;
                if tx.send(feed.event(replay_id)).await.is_err() {
                    debug!(channel = %feed.channel, "mock feed channel closed");
                    break;
                }
                sent += 1;
                trace!(channel = %feed.channel, replay_id, "mock event sent");
            }

            debug!(channel = %feed.channel, sent, "mock feed stopped");
        })
    }
}
