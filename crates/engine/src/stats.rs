//! Run statistics

use std::time::Duration;

use observability::ForwardingMetricsAggregator;

/// Statistics from a forwarding run
#[derive(Debug, Clone, Default)]
pub struct ForwardingStats {
    /// Aggregated counters and delivery latency
    pub metrics: ForwardingMetricsAggregator,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Highest number of concurrent forwarding tasks
    pub peak_in_flight: usize,
}

impl ForwardingStats {
    pub fn received(&self) -> u64 {
        self.metrics.total_received
    }

    pub fn forwarded(&self) -> u64 {
        self.metrics.total_forwarded
    }

    pub fn dropped(&self) -> u64 {
        self.metrics.total_dropped
    }

    pub fn sink_errors(&self) -> u64 {
        self.metrics.total_sink_errors
    }

    pub fn task_failures(&self) -> u64 {
        self.metrics.total_task_failures
    }

    /// Tasks whose completion was handled
    pub fn completed(&self) -> u64 {
        self.forwarded() + self.dropped() + self.sink_errors() + self.task_failures()
    }

    /// Forwarded messages per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.forwarded() as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}
