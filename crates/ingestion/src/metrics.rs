//! Subscription metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters of a single subscription
#[derive(Debug, Default)]
pub struct SubscriptionMetrics {
    /// Total events received from the feed
    pub received: AtomicU64,

    /// Events skipped because they were at or below the replay marker
    pub skipped: AtomicU64,

    /// Replay storage failures that surfaced as errors
    pub marker_errors: AtomicU64,
}

impl SubscriptionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record event received
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record event skipped on resume
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record replay storage failure
    pub fn record_marker_error(&self) {
        self.marker_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            marker_errors: self.marker_errors.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub skipped: u64,
    pub marker_errors: u64,
}
