//! # Observability
//!
//! 转发器的日志与指标：`tracing` 订阅器初始化、Prometheus 导出，以及转发
//! 指标的记录与汇总。
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{LogFormat, ObservabilityConfig};
//!
//! // 初始化日志，-v 对应 debug
//! observability::init_with_config(
//!     ObservabilityConfig::new(LogFormat::Compact).with_verbosity(1, false),
//! )?;
//!
//! // 按需启动 Prometheus 导出
//! observability::init_metrics_only(9000)?;
//!
//! // 记录转发指标
//! observability::record_message_forwarded("broker1", elapsed_ms);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

// Re-exports
pub use crate::metrics::{
    record_in_flight, record_message_dropped, record_message_forwarded, record_message_received,
    record_sink_error, record_task_failure, ForwardingMetricsAggregator, MetricsSummary,
    RunningStats, StatsSummary,
};

/// 可观测性配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
    /// `RUST_LOG` 未设置时使用的过滤指令
    pub default_log_level: String,
}

impl ObservabilityConfig {
    /// 仅日志，不导出指标
    pub fn new(log_format: LogFormat) -> Self {
        Self {
            log_format,
            metrics_port: None,
            default_log_level: log_level(0, false).to_string(),
        }
    }

    /// 由 `-v` 次数和 `-q` 决定默认级别
    pub fn with_verbosity(mut self, verbose: u8, quiet: bool) -> Self {
        self.default_log_level = log_level(verbose, quiet).to_string();
        self
    }

    pub fn with_metrics_port(mut self, port: Option<u16>) -> Self {
        self.metrics_port = port;
        self
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self::new(LogFormat::default())
    }
}

/// `-q` 优先，其次 `-v` / `-vv`
pub fn log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "warn";
    }
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    Json,
    /// 人类可读格式
    #[default]
    Pretty,
    /// 紧凑单行格式
    Compact,
}

impl LogFormat {
    fn layer(self) -> Box<dyn Layer<Registry> + Send + Sync> {
        match self {
            Self::Json => fmt::layer()
                .json()
                .with_target(true)
                .with_thread_names(true)
                .with_current_span(true)
                .boxed(),
            Self::Pretty => fmt::layer().pretty().boxed(),
            Self::Compact => fmt::layer().compact().with_target(false).boxed(),
        }
    }
}

/// 初始化 tracing 订阅器，并在配置了端口时启动 Prometheus 导出
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    tracing_subscriber::registry()
        .with(config.log_format.layer().with_filter(filter))
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );
    Ok(())
}

/// 仅安装 Prometheus 导出器
///
/// `run` 命令在日志初始化之后按需调用。
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus exporter on port {port}"))?;

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}
