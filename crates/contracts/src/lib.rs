//! # Contracts
//!
//! Frozen interface contracts shared by every blink-sync crate: events,
//! states, outcomes, configuration and collaborator traits.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Every event carries a `TimestampUs` taken from one shared monotonic clock
//! - The visual and bio-signal channels must stamp on the same clock so that
//!   `bio - visual` is a meaningful latency

mod blueprint;
mod clock;
mod error;
mod event;
mod outcome;
mod scenario;
mod sink;
mod source;
mod state;
mod timer;
mod timing;

pub use blueprint::*;
pub use clock::{ManualClock, MonotonicClock, SystemClock, TimestampUs};
pub use error::*;
pub use event::*;
pub use outcome::*;
pub use scenario::*;
pub use sink::*;
pub use source::{
    BioSignal, BioSignalCallback, BioSignalSource, RecorderBridge, VisualCallback, VisualSource,
};
pub use state::SyncState;
pub use timer::{TimerKind, TimerToken};
pub use timing::TimingConfig;
