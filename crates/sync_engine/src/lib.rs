//! # Sync Engine
//!
//! 眨眼同步状态机：将摄像头检测到的眨眼与头带 EEG 伪迹对齐。
//!
//! 负责：
//! - 事件驱动的状态迁移（纯函数，副作用以 `Effect` 返回）
//! - 延迟窗口判定
//! - 信号质量滞回
//! - 会话定时器与宿主任务
//!
//! ## 使用示例
//!
//! ```ignore
//! use sync_engine::{spawn_host, BlinkSyncEngine, HostOptions, RetryPolicy};
//!
//! let engine = BlinkSyncEngine::new(TimingConfig::default());
//! let (handle, mut outcomes, join) =
//!     spawn_host(engine, clock, recorder, RetryPolicy::default(), HostOptions::default());
//!
//! handle.start_session().await?;
//! // Sources submit visual / bio events through the handle
//! if let Some(outcome) = outcomes.recv().await {
//!     // Handle session outcome
//! }
//! ```

mod effect;
mod engine;
mod error;
mod host;
mod policy;
mod quality;
mod session;
mod timer;
mod window;

pub use effect::Effect;
pub use engine::BlinkSyncEngine;
pub use error::SyncError;
pub use host::{spawn_host, HostMessage, HostOptions, HostStats, SessionHandle, SessionHost};
pub use policy::{DecisionPolicy, RetryPolicy};
pub use quality::{Degraded, QualityGate, QualityVerdict};
pub use session::Session;
pub use timer::{TimerSlot, TimerSlots};
pub use window::{LatencyVerdict, LatencyWindow};

// Re-export contracts types
pub use contracts::{SessionOutcome, StampedEvent, SyncEvent, SyncState, TimingConfig};
