//! # Ingestion
//!
//! Subscription message sources.
//!
//! Responsibilities:
//! - Buffer subscription events in a bounded async-channel per subscription
//! - Feed events from recordings (JSON Lines) or a mock generator
//! - Track replay markers so restarts resume after the last received event
//! - Fan-in several subscriptions into one `MessageSource`
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::MessageSource;
//! use ingestion::SubscriptionSource;
//!
//! let (mut source, tx) = SubscriptionSource::channel("org1", 100);
//! source.open().await?;
//! tx.send(message).await?;
//! let (source_id, message) = source.get_message().await?;
//! ```

mod any_source;
mod metrics;
mod mock;
mod multi;
mod recording;
mod replay;
mod subscription;

// Re-exports
pub use any_source::AnyMessageSource;
pub use metrics::{MetricsSnapshot, SubscriptionMetrics};
pub use mock::MockFeed;
pub use multi::MultiMessageSource;
pub use recording::RecordingFeed;
pub use replay::{AnyReplayStorage, FileReplayStorage, MemoryReplayStorage, ReplayTracker};
pub use subscription::{Feed, SubscriptionSource};
