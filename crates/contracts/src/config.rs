//! ForwarderConfig - Config Loader 输出
//!
//! 描述完整的转发配置：订阅源、投递目标、路由规则。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::Route;

/// 路由可携带的投递属性键
pub const ALLOWED_ROUTE_PROPERTIES: &[&str] = &[
    "content_type",
    "content_encoding",
    "headers",
    "delivery_mode",
    "priority",
    "correlation_id",
    "reply_to",
    "expiration",
    "message_id",
    "timestamp",
    "type",
    "user_id",
    "app_id",
    "cluster_id",
];

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的转发配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwarderConfig {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 订阅源配置
    pub source: SourceConfig,

    /// 投递目标配置
    pub sink: SinkConfig,

    /// 路由配置
    #[serde(default)]
    pub router: RouterConfig,
}

impl ForwarderConfig {
    /// 所有路由 (默认路由 + 规则路由)，附带字段路径
    pub fn routes(&self) -> impl Iterator<Item = (String, &Route)> {
        let default = self
            .router
            .default_route
            .iter()
            .map(|route| ("router.default_route".to_string(), route));
        let rules = self
            .router
            .rules
            .iter()
            .enumerate()
            .map(|(idx, rule)| (format!("router.rules[{idx}].route"), &rule.route));
        default.chain(rules)
    }
}

/// 订阅源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// 订阅名称 -> 订阅定义
    pub subscriptions: BTreeMap<String, SubscriptionConfig>,

    /// Replay marker 存储 (可选)
    #[serde(default)]
    pub replay: Option<ReplayStorageConfig>,

    /// 每个订阅的缓冲容量
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_buffer_size() -> usize {
    256
}

/// 订阅定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubscriptionConfig {
    /// 回放录制的事件文件 (JSON Lines)
    File {
        path: PathBuf,
        /// 事件缺少 channel 字段时填充
        #[serde(default)]
        channel: Option<String>,
    },

    /// 生成模拟事件
    Mock {
        channel: String,
        #[serde(default = "default_interval_ms")]
        interval_ms: u64,
        /// 生成数量 (None = 无限)
        #[serde(default)]
        count: Option<u64>,
    },
}

fn default_interval_ms() -> u64 {
    1000
}

impl SubscriptionConfig {
    /// 类型名 (用于日志/展示)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::File { .. } => "file",
            Self::Mock { .. } => "mock",
        }
    }
}

/// Replay marker 存储配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayStorageConfig {
    /// 进程内存储 (重启后丢失)
    Memory {
        #[serde(default)]
        key_prefix: Option<String>,
    },

    /// JSON 文件存储
    File {
        path: PathBuf,
        #[serde(default)]
        key_prefix: Option<String>,
    },
}

impl ReplayStorageConfig {
    pub fn key_prefix(&self) -> Option<&str> {
        match self {
            Self::Memory { key_prefix } | Self::File { key_prefix, .. } => key_prefix.as_deref(),
        }
    }
}

/// 投递目标配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// 目标名称 -> 目标定义
    pub destinations: BTreeMap<String, DestinationConfig>,
}

/// 单个投递目标
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// 传输方式
    #[serde(flatten)]
    pub transport: TransportConfig,

    /// 声明的 exchange 列表
    #[serde(default)]
    pub exchanges: Vec<ExchangeConfig>,
}

impl DestinationConfig {
    /// 是否声明了名为 `name` 的 exchange
    pub fn declares_exchange(&self, name: &str) -> bool {
        self.exchanges.iter().any(|exchange| exchange.name == name)
    }
}

/// 传输方式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    /// 仅输出日志
    Log,

    /// 追加写入 JSON Lines 文件
    File { path: PathBuf },

    /// UDP 数据报
    Udp {
        addr: String,
        #[serde(default = "default_max_datagram_size")]
        max_datagram_size: usize,
    },
}

fn default_max_datagram_size() -> usize {
    65000
}

impl TransportConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::File { .. } => "file",
            Self::Udp { .. } => "udp",
        }
    }
}

/// Exchange 声明
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub name: String,

    #[serde(default)]
    pub kind: ExchangeKind,

    #[serde(default)]
    pub durable: bool,
}

/// Exchange 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeKind {
    #[default]
    Topic,
    Direct,
    Fanout,
    Headers,
}

/// 路由配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterConfig {
    /// 无规则匹配时使用 (None = 丢弃)
    #[serde(default)]
    pub default_route: Option<Route>,

    /// 按优先级排列的规则
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// 路由规则
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// JSONPath 条件，作用于 `[{source_id, message}]`
    pub condition: String,

    pub route: Route,
}
