//! Headband quality hysteresis.
//!
//! Degradation starts on the first sample that is not `good`; only a
//! `perfect` sample ends it. A degraded period longer than the grace expires
//! exactly once.

use contracts::{QualitySample, SyncState, TimestampUs};

/// Active degraded period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Degraded {
    pub since: TimestampUs,
    /// State to resume once quality recovers
    pub resume: SyncState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityVerdict {
    /// Nothing changes
    Steady,
    /// Processing must be suspended
    Degrade,
    /// Quality recovered; resume this state
    Restore(SyncState),
    /// Degraded for longer than the grace period
    Expired,
}

#[derive(Debug, Clone)]
pub struct QualityGate {
    grace_us: i64,
    degraded: Option<Degraded>,
}

impl QualityGate {
    pub fn new(grace_us: i64) -> Self {
        Self {
            grace_us,
            degraded: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    pub fn degraded(&self) -> Option<Degraded> {
        self.degraded
    }

    /// Feed one quality notification received while `current` is active
    pub fn observe(
        &mut self,
        current: SyncState,
        sample: QualitySample,
        now: TimestampUs,
    ) -> QualityVerdict {
        match self.degraded {
            Some(degraded) => {
                if sample.perfect {
                    self.degraded = None;
                    QualityVerdict::Restore(degraded.resume)
                } else if now - degraded.since >= self.grace_us {
                    self.degraded = None;
                    QualityVerdict::Expired
                } else {
                    QualityVerdict::Steady
                }
            }
            None => {
                if !sample.good && Self::can_degrade(current) {
                    self.degraded = Some(Degraded {
                        since: now,
                        resume: current,
                    });
                    QualityVerdict::Degrade
                } else {
                    QualityVerdict::Steady
                }
            }
        }
    }

    /// Grace timer elapsed; true if this ends a degraded period
    pub fn grace_elapsed(&mut self) -> bool {
        self.degraded.take().is_some()
    }

    pub fn reset(&mut self) {
        self.degraded = None;
    }

    // A confirmed match is never interrupted by quality.
    fn can_degrade(state: SyncState) -> bool {
        state.is_processing() && state != SyncState::BlinkDetected
    }
}
