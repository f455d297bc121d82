//! Timing policy constants.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::TimerKind;

/// Timing configuration for the blink synchronization state machine
///
/// Latencies are microseconds on the shared clock; delays are wall durations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TimingConfig {
    /// Lower bound (inclusive) of the accepted bio - visual latency
    #[validate(range(min = 0))]
    pub min_latency_us: i64,

    /// Upper bound (inclusive) of the accepted bio - visual latency
    #[validate(range(min = 1))]
    pub max_latency_us: i64,

    /// A visual blink ending within this long is too short to trust
    #[validate(range(min = 0))]
    pub min_visual_blink_us: i64,

    /// How long to wait for the device blink after a visual blink
    #[validate(range(min = 1))]
    pub device_blink_deadline_ms: u64,

    /// Delay between a confirmed match and emitting the outcome
    pub accept_grace_ms: u64,

    /// Settle delay after an aborted attempt
    pub abort_settle_ms: u64,

    /// Delay before retrying after a blink timeout
    pub timeout_retry_ms: u64,

    /// Face confirmation delay after re-acquiring a face
    pub face_confirm_ms: u64,

    /// Settle delay after face confirmation failed
    pub face_lost_settle_ms: u64,

    /// Whole-session deadline
    #[validate(range(min = 1))]
    pub session_timeout_secs: u64,

    /// How long quality may stay degraded before the session fails
    #[validate(range(min = 1))]
    pub quality_grace_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            min_latency_us: 50_000,
            max_latency_us: 180_000,
            min_visual_blink_us: 40_000,
            device_blink_deadline_ms: 1_000,
            accept_grace_ms: 1_000,
            abort_settle_ms: 3_000,
            timeout_retry_ms: 2_000,
            face_confirm_ms: 2_000,
            face_lost_settle_ms: 3_000,
            session_timeout_secs: 90,
            quality_grace_secs: 8,
        }
    }
}

impl TimingConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn quality_grace(&self) -> Duration {
        Duration::from_secs(self.quality_grace_secs)
    }

    /// Quality grace period in microseconds
    pub fn quality_grace_us(&self) -> i64 {
        self.quality_grace().as_micros() as i64
    }

    /// Duration to schedule for a timer of the given kind
    pub fn timer_duration(&self, kind: TimerKind) -> Duration {
        match kind {
            TimerKind::SessionDeadline => self.session_timeout(),
            TimerKind::QualityGrace => self.quality_grace(),
            TimerKind::DeviceBlinkDeadline => Duration::from_millis(self.device_blink_deadline_ms),
            TimerKind::AcceptGrace => Duration::from_millis(self.accept_grace_ms),
            TimerKind::AbortSettle => Duration::from_millis(self.abort_settle_ms),
            TimerKind::TimeoutRetry => Duration::from_millis(self.timeout_retry_ms),
            TimerKind::FaceConfirm => Duration::from_millis(self.face_confirm_ms),
            TimerKind::FaceLostSettle => Duration::from_millis(self.face_lost_settle_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_constants() {
        let timing = TimingConfig::default();
        assert_eq!(timing.min_latency_us, 50_000);
        assert_eq!(timing.max_latency_us, 180_000);
        assert_eq!(timing.min_visual_blink_us, 40_000);
        assert_eq!(timing.session_timeout(), Duration::from_secs(90));
        assert_eq!(timing.quality_grace_us(), 8_000_000);
        assert_eq!(
            timing.timer_duration(TimerKind::DeviceBlinkDeadline),
            Duration::from_secs(1)
        );
        assert!(timing.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let timing: TimingConfig = toml::from_str("max_latency_us = 200000").unwrap();
        assert_eq!(timing.max_latency_us, 200_000);
        assert_eq!(timing.min_latency_us, 50_000);
    }

    #[test]
    fn zero_deadline_is_rejected() {
        let timing = TimingConfig {
            device_blink_deadline_ms: 0,
            ..Default::default()
        };
        assert!(timing.validate().is_err());
    }
}
