//! # Engine
//!
//! Forwarding engine: takes `(source_id, message)` pairs from a
//! `MessageSource`, resolves a route with the `MessageRouter` and delivers
//! through a `MessageSink`, one task per message.
//!
//! ## Shutdown
//!
//! Cancelling the token closes the source; buffered messages are still
//! forwarded, in-flight deliveries are awaited and the sink is closed last.
//!
//! ```ignore
//! let engine = ForwardingEngine::new(source, sink, router, ForwardingPolicy::default());
//! let stats = engine.run(shutdown.clone()).await?;
//! ```

mod engine;
mod observer;
mod state;
mod stats;

pub use engine::{ForwardingEngine, ForwardingPolicy};
pub use observer::{DeliveryContext, ForwardingObserver, TracingObserver};
pub use state::EngineState;
pub use stats::ForwardingStats;
pub use tokio_util::sync::CancellationToken;
