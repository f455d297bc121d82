//! Session orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{SessionRun, SessionRunConfig};
pub use stats::RunStats;
