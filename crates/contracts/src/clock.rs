//! Shared monotonic clock.
//!
//! Both event channels stamp their reports through the same `MonotonicClock`
//! so that deltas between a visual blink and a device blink are comparable.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// Monotonic timestamp in microseconds since the clock's origin
pub type TimestampUs = i64;

/// Monotonic microsecond clock
pub trait MonotonicClock: Send + Sync {
    /// Current time in microseconds since the clock's origin
    fn now_us(&self) -> TimestampUs;
}

/// Clock backed by `std::time::Instant`
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is "now"
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now_us(&self) -> TimestampUs {
        self.origin.elapsed().as_micros() as TimestampUs
    }
}

/// Manually driven clock for deterministic tests and offline replays
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a manual clock starting at `start_us`
    pub fn new(start_us: TimestampUs) -> Self {
        Self {
            now: AtomicI64::new(start_us),
        }
    }

    /// Jump to an absolute time. Going backwards is ignored.
    pub fn set(&self, now_us: TimestampUs) {
        self.now.fetch_max(now_us, Ordering::SeqCst);
    }

    /// Advance by `delta_us` and return the new time
    pub fn advance(&self, delta_us: TimestampUs) -> TimestampUs {
        self.now.fetch_add(delta_us.max(0), Ordering::SeqCst) + delta_us.max(0)
    }
}

impl MonotonicClock for ManualClock {
    fn now_us(&self) -> TimestampUs {
        self.now.load(Ordering::SeqCst)
    }
}
