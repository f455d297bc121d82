//! Session outcome - the single terminal result of a synchronization session

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TimestampUs;

/// Per-session diagnostic counters
///
/// Telemetry only; never used to decide acceptance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlinkCounters {
    /// Visual blink onsets seen while processing
    pub visual_blinks: u64,
    /// Good-quality blink artifacts received
    pub bio_blinks: u64,
    /// Artifacts that arrived before the latency window opened
    pub bio_too_early: u64,
    /// Artifacts that arrived after the latency window closed
    pub bio_too_late: u64,
}

/// A confirmed cross-modal blink match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlinkMatch {
    /// When the camera saw the blink start
    pub visual_timestamp_us: TimestampUs,
    /// When the headband blink artifact arrived
    pub bio_timestamp_us: TimestampUs,
    /// EEG sample index read from the recorder at acceptance
    pub sample_index: u64,
    /// `bio_timestamp_us - visual_timestamp_us`
    pub latency_us: i64,
}

impl BlinkMatch {
    /// Latency truncated to whole milliseconds
    pub fn latency_ms(&self) -> i64 {
        self.latency_us / 1000
    }
}

/// Why a session ended without a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionFailure {
    /// The session deadline elapsed without a match
    Timeout,
    /// Headband quality stayed degraded past the grace period
    QualityDegraded,
    /// The camera could not be used
    CaptureUnavailable { reason: String },
}

impl SessionFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionFailure::Timeout => "timeout",
            SessionFailure::QualityDegraded => "quality_degraded",
            SessionFailure::CaptureUnavailable { .. } => "capture_unavailable",
        }
    }
}

impl fmt::Display for SessionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionFailure::CaptureUnavailable { reason } => {
                write!(f, "capture unavailable: {reason}")
            }
            other => f.write_str(other.as_str()),
        }
    }
}

/// Terminal result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// `{accepted: true, ...}`
    Accepted(BlinkMatch),
    /// `{accepted: false}`
    Failed { failure: SessionFailure },
    /// `{cancelled: true}`
    Cancelled,
}

impl Outcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted(_))
    }

    pub fn blink_match(&self) -> Option<&BlinkMatch> {
        match self {
            Outcome::Accepted(m) => Some(m),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&SessionFailure> {
        match self {
            Outcome::Failed { failure } => Some(failure),
            _ => None,
        }
    }

    pub fn visual_timestamp_us(&self) -> Option<TimestampUs> {
        self.blink_match().map(|m| m.visual_timestamp_us)
    }

    pub fn bio_timestamp_us(&self) -> Option<TimestampUs> {
        self.blink_match().map(|m| m.bio_timestamp_us)
    }

    pub fn sample_index(&self) -> Option<u64> {
        self.blink_match().map(|m| m.sample_index)
    }

    /// Stable label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Accepted(_) => "accepted",
            Outcome::Failed { .. } => "failed",
            Outcome::Cancelled => "cancelled",
        }
    }
}

/// Outcome delivered to consumers, tagged with its session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOutcome {
    /// Session generation
    pub session_id: u64,
    pub outcome: Outcome,
    /// Counters at close time
    pub counters: BlinkCounters,
}

/// A condition that needs a host decision before the session can go on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escalation {
    pub session_id: u64,
    pub failure: SessionFailure,
    /// The bio-signal connection should be re-acquired with clean data
    pub needs_clean_data: bool,
    /// Counters at escalation time
    pub counters: BlinkCounters,
}
