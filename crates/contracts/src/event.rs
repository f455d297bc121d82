//! Events consumed by the synchronization state machine.
//!
//! Visual and bio-signal reports, host commands and timer firings all travel
//! as `StampedEvent`s through one queue.

use serde::{Deserialize, Serialize};

use crate::{TimerToken, TimestampUs};

/// Report from the camera/face-feature pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VisualEvent {
    /// A frame with a face in it, sampled for eye closure
    Face { blinking: bool },
    /// A frame without a face
    NoFace,
}

/// Artifact packet from the headband
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEvent {
    /// Blink artifact detected in the EEG
    pub blink: bool,
    /// Headband quality classification at arrival time
    pub quality_good: bool,
}

/// Headband signal-quality notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySample {
    /// Quality good enough to trust artifacts
    pub good: bool,
    /// Quality clean enough to end a degraded period
    pub perfect: bool,
}

impl QualitySample {
    pub fn perfect() -> Self {
        Self {
            good: true,
            perfect: true,
        }
    }

    pub fn good() -> Self {
        Self {
            good: true,
            perfect: false,
        }
    }

    pub fn poor() -> Self {
        Self {
            good: false,
            perfect: false,
        }
    }
}

/// Host answer to an escalation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Reset the session and start looking for a blink again
    Retry,
    /// Close the session with a failed outcome
    GiveUp,
    /// Close the session as cancelled
    Cancel,
}

/// Everything the state machine reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Open a new session
    Start,
    /// Close the current session as cancelled
    Cancel,
    /// The camera cannot be used
    CaptureUnavailable { reason: String },
    Visual(VisualEvent),
    Artifact(ArtifactEvent),
    Quality(QualitySample),
    /// Host answer for a parked session
    Decision(Decision),
    /// A scheduled timer elapsed
    Timer(TimerToken),
}

impl SyncEvent {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            SyncEvent::Start => "start",
            SyncEvent::Cancel => "cancel",
            SyncEvent::CaptureUnavailable { .. } => "capture_unavailable",
            SyncEvent::Visual(VisualEvent::Face { .. }) => "face",
            SyncEvent::Visual(VisualEvent::NoFace) => "no_face",
            SyncEvent::Artifact(_) => "artifact",
            SyncEvent::Quality(_) => "quality",
            SyncEvent::Decision(_) => "decision",
            SyncEvent::Timer(_) => "timer",
        }
    }
}

/// Event with its arrival time on the shared clock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampedEvent {
    pub at: TimestampUs,
    pub event: SyncEvent,
}

impl StampedEvent {
    pub fn new(at: TimestampUs, event: SyncEvent) -> Self {
        Self { at, event }
    }
}
