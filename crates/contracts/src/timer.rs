//! Timer identity.
//!
//! Timers are owned by a session: a token carries the session generation and
//! a sequence number, so a firing can be matched against the timer that is
//! currently armed. Anything else is stale.

use serde::{Deserialize, Serialize};

/// What a timer is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Whole-session deadline
    SessionDeadline,
    /// Degraded-quality grace period
    QualityGrace,
    /// Wait for the device blink after a visual blink
    DeviceBlinkDeadline,
    /// Delay between a confirmed match and emitting it
    AcceptGrace,
    /// Settle delay after an aborted attempt
    AbortSettle,
    /// Delay before retrying after a blink timeout
    TimeoutRetry,
    /// Face confirmation after re-acquiring a face
    FaceConfirm,
    /// Settle delay after face confirmation failed
    FaceLostSettle,
}

impl TimerKind {
    /// Stable snake_case name
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerKind::SessionDeadline => "session_deadline",
            TimerKind::QualityGrace => "quality_grace",
            TimerKind::DeviceBlinkDeadline => "device_blink_deadline",
            TimerKind::AcceptGrace => "accept_grace",
            TimerKind::AbortSettle => "abort_settle",
            TimerKind::TimeoutRetry => "timeout_retry",
            TimerKind::FaceConfirm => "face_confirm",
            TimerKind::FaceLostSettle => "face_lost_settle",
        }
    }
}

/// Handle to one armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerToken {
    /// Session generation that armed the timer
    pub session: u64,
    /// Sequence number, unique across sessions
    pub seq: u64,
    /// Purpose
    pub kind: TimerKind,
}
