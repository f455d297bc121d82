//! # Dispatcher
//!
//! 会话结果分发模块。
//!
//! 负责：
//! - 消费 `SessionOutcome`
//! - Fan-out 到多个 sinks
//! - 每个 sink 独立写入任务；写失败只计数，队列满时等待而不丢弃结果

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{OutcomeSink, SessionOutcome};
pub use dispatcher::{Dispatcher, DispatcherBuilder, DispatcherConfig, create_dispatcher};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{FileSink, FileSinkConfig, LogSink};
