//! SyncState - the blink synchronization state machine's states

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TimerKind;

/// Blink synchronization state
///
/// Exactly one state is active per session. `Idle` doubles as the state of a
/// closed session and of a session parked on a host decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Idle,
    /// Waiting for the camera to report a face
    WaitingForFace,
    /// Face seen again after a failure; confirming it stays in view
    FaceDetected,
    /// Face confirmation failed; settling before looking again
    FaceLost,
    /// Face confirmed, waiting for the camera to see a blink
    WaitingForVisualBlink,
    /// Camera saw a blink, waiting for the headband's blink artifact
    WaitingForDeviceBlink,
    /// Headband artifact matched the visual blink
    BlinkDetected,
    /// No matching artifact (deadline, or artifact outside the latency window)
    BlinkTimeout,
    /// Attempt aborted (blink too short, face lost mid-attempt)
    BlinkAborted,
    /// User blinked again while an abort was settling
    BlinkAbortedRestart,
    /// Headband signal quality dropped; normal processing suspended
    QualityDegraded,
}

impl SyncState {
    /// All states, in declaration order
    pub const ALL: [SyncState; 11] = [
        SyncState::Idle,
        SyncState::WaitingForFace,
        SyncState::FaceDetected,
        SyncState::FaceLost,
        SyncState::WaitingForVisualBlink,
        SyncState::WaitingForDeviceBlink,
        SyncState::BlinkDetected,
        SyncState::BlinkTimeout,
        SyncState::BlinkAborted,
        SyncState::BlinkAbortedRestart,
        SyncState::QualityDegraded,
    ];

    /// Stable snake_case name (used for logs and metric labels)
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::WaitingForFace => "waiting_for_face",
            SyncState::FaceDetected => "face_detected",
            SyncState::FaceLost => "face_lost",
            SyncState::WaitingForVisualBlink => "waiting_for_visual_blink",
            SyncState::WaitingForDeviceBlink => "waiting_for_device_blink",
            SyncState::BlinkDetected => "blink_detected",
            SyncState::BlinkTimeout => "blink_timeout",
            SyncState::BlinkAborted => "blink_aborted",
            SyncState::BlinkAbortedRestart => "blink_aborted_restart",
            SyncState::QualityDegraded => "quality_degraded",
        }
    }

    /// Whether the state participates in visual/bio event processing
    pub fn is_processing(&self) -> bool {
        !matches!(self, SyncState::Idle | SyncState::QualityDegraded)
    }

    /// Timer armed on entry to this state, if any
    pub fn timer_kind(&self) -> Option<TimerKind> {
        match self {
            SyncState::FaceDetected => Some(TimerKind::FaceConfirm),
            SyncState::FaceLost => Some(TimerKind::FaceLostSettle),
            SyncState::WaitingForDeviceBlink => Some(TimerKind::DeviceBlinkDeadline),
            SyncState::BlinkDetected => Some(TimerKind::AcceptGrace),
            SyncState::BlinkTimeout => Some(TimerKind::TimeoutRetry),
            SyncState::BlinkAborted | SyncState::BlinkAbortedRestart => {
                Some(TimerKind::AbortSettle)
            }
            _ => None,
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
