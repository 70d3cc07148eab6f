//! # Application
//!
//! 应用装配模块。
//!
//! 负责：
//! - 从配置构建订阅源、路由器和投递目标
//! - 按运行选项组装 `ForwardingEngine` 并运行
//!
//! ## 使用示例
//!
//! ```ignore
//! use application::{Application, ApplicationOptions};
//!
//! let mut app = Application::new(config, ApplicationOptions::default());
//! app.configure().await?;
//! let stats = app.run(shutdown).await?;
//! ```

mod application;
mod factory;

pub use application::{Application, ApplicationOptions, DEFAULT_SOURCE_CONNECTION_TIMEOUT};
pub use dispatcher::create_message_sink;
pub use engine::{CancellationToken, EngineState, ForwardingStats};
pub use factory::{create_message_source, create_router};
