//! Forwarder 指标收集模块
//!
//! 记录消息接收、转发、丢弃与失败的计数，并在内存中聚合运行摘要。

use std::collections::BTreeMap;

use metrics::{counter, gauge, histogram};

/// 记录从订阅源接收到的消息
pub fn record_message_received(source: &str) {
    counter!(
        "forwarder_messages_received_total",
        "source" => source.to_string()
    )
    .increment(1);
}

/// 记录成功转发的消息
pub fn record_message_forwarded(destination: &str, elapsed_ms: f64) {
    counter!(
        "forwarder_messages_forwarded_total",
        "destination" => destination.to_string()
    )
    .increment(1);
    histogram!("forwarder_delivery_latency_ms").record(elapsed_ms);
}

/// 记录因无路由而丢弃的消息
pub fn record_message_dropped(source: &str) {
    counter!(
        "forwarder_messages_dropped_total",
        "source" => source.to_string()
    )
    .increment(1);
}

/// 记录投递失败
pub fn record_sink_error() {
    counter!("forwarder_sink_errors_total").increment(1);
}

/// 记录转发任务的意外失败 (包括 panic)
pub fn record_task_failure() {
    counter!("forwarder_task_failures_total").increment(1);
}

/// 记录当前在途的转发任务数
pub fn record_in_flight(count: usize) {
    gauge!("forwarder_in_flight").set(count as f64);
}

/// 转发指标聚合器
///
/// 在内存中聚合指标，便于运行结束时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct ForwardingMetricsAggregator {
    /// 接收总数
    pub total_received: u64,

    /// 转发总数
    pub total_forwarded: u64,

    /// 无路由丢弃总数
    pub total_dropped: u64,

    /// 投递失败总数
    pub total_sink_errors: u64,

    /// 任务失败总数
    pub total_task_failures: u64,

    /// 投递耗时统计
    pub latency_stats: RunningStats,

    /// 各目标转发次数
    pub destination_counts: BTreeMap<String, u64>,
}

impl ForwardingMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_received(&mut self) {
        self.total_received += 1;
    }

    pub fn on_forwarded(&mut self, destination: &str, elapsed_ms: f64) {
        self.total_forwarded += 1;
        self.latency_stats.push(elapsed_ms);
        *self
            .destination_counts
            .entry(destination.to_string())
            .or_insert(0) += 1;
    }

    pub fn on_dropped(&mut self) {
        self.total_dropped += 1;
    }

    pub fn on_sink_error(&mut self) {
        self.total_sink_errors += 1;
    }

    pub fn on_task_failure(&mut self) {
        self.total_task_failures += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_received: self.total_received,
            total_forwarded: self.total_forwarded,
            total_dropped: self.total_dropped,
            total_sink_errors: self.total_sink_errors,
            total_task_failures: self.total_task_failures,
            drop_rate: if self.total_received > 0 {
                self.total_dropped as f64 / self.total_received as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
            destination_counts: self.destination_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_received: u64,
    pub total_forwarded: u64,
    pub total_dropped: u64,
    pub total_sink_errors: u64,
    pub total_task_failures: u64,
    pub drop_rate: f64,
    pub latency_ms: StatsSummary,
    pub destination_counts: BTreeMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Forwarding Summary ===")?;
        writeln!(f, "Received: {}", self.total_received)?;
        writeln!(f, "Forwarded: {}", self.total_forwarded)?;
        writeln!(
            f,
            "Dropped (no route): {} ({:.2}%)",
            self.total_dropped, self.drop_rate
        )?;
        writeln!(f, "Sink errors: {}", self.total_sink_errors)?;
        writeln!(f, "Task failures: {}", self.total_task_failures)?;
        writeln!(f, "Delivery latency (ms): {}", self.latency_ms)?;

        if !self.destination_counts.is_empty() {
            writeln!(f, "Per destination:")?;
            for (destination, count) in &self.destination_counts {
                writeln!(f, "  {}: {}", destination, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
