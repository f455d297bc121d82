//! Latency window acceptance policy.

use contracts::TimingConfig;

/// Verdict for one bio - visual delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyVerdict {
    Accepted,
    TooEarly,
    TooLate,
}

impl LatencyVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            LatencyVerdict::Accepted => "accepted",
            LatencyVerdict::TooEarly => "too_early",
            LatencyVerdict::TooLate => "too_late",
        }
    }
}

/// Inclusive `[min_us, max_us]` window on the artifact delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyWindow {
    pub min_us: i64,
    pub max_us: i64,
}

impl LatencyWindow {
    pub fn new(min_us: i64, max_us: i64) -> Self {
        Self { min_us, max_us }
    }

    pub fn from_timing(timing: &TimingConfig) -> Self {
        Self::new(timing.min_latency_us, timing.max_latency_us)
    }

    /// Classify `bio - visual`
    ///
    /// Negative deltas (artifact stamped before the visual blink) are too early.
    pub fn classify(&self, delta_us: i64) -> LatencyVerdict {
        if delta_us < self.min_us {
            LatencyVerdict::TooEarly
        } else if delta_us > self.max_us {
            LatencyVerdict::TooLate
        } else {
            LatencyVerdict::Accepted
        }
    }
}

impl Default for LatencyWindow {
    fn default() -> Self {
        Self::from_timing(&TimingConfig::default())
    }
}
