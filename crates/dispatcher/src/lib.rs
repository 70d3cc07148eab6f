//! # Dispatcher
//!
//! 消息投递模块。
//!
//! 负责：
//! - 按目标名称分发消息 (fan-out 到命名目标)
//! - 强制 `content_type` / `content_encoding` 投递属性
//! - 将底层错误统一为 sink 错误

pub mod dispatcher;
pub mod envelope;
pub mod metrics;
pub mod sinks;

pub use contracts::MessageSink;
pub use dispatcher::{create_message_sink, AnySink, MultiMessageSink};
pub use envelope::{delivery_properties, DeclaredExchanges, Delivery};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{FileSink, LogSink, NetworkSink, NetworkSinkConfig};
