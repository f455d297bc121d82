//! EEG recorder stand-in

use std::sync::Arc;

use contracts::{MonotonicClock, RecorderBridge, TimestampUs};

/// Recorder whose sample index grows with elapsed time
///
/// `index = (now - origin) * sample_rate_hz`, which is what a recorder
/// writing at a fixed rate since `origin` reports.
pub struct ClockedRecorder {
    clock: Arc<dyn MonotonicClock>,
    origin_us: TimestampUs,
    sample_rate_hz: f64,
}

impl ClockedRecorder {
    /// Recorder starting now on `clock`
    pub fn new(clock: Arc<dyn MonotonicClock>, sample_rate_hz: f64) -> Self {
        let origin_us = clock.now_us();
        Self {
            clock,
            origin_us,
            sample_rate_hz,
        }
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }
}

impl RecorderBridge for ClockedRecorder {
    fn current_sample_index(&self) -> u64 {
        let elapsed_us = (self.clock.now_us() - self.origin_us).max(0);
        (elapsed_us as f64 * self.sample_rate_hz / 1_000_000.0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ManualClock;

    #[test]
    fn test_index_tracks_elapsed_time() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let recorder = ClockedRecorder::new(clock.clone(), 256.0);
        assert_eq!(recorder.current_sample_index(), 0);

        clock.advance(1_000_000);
        assert_eq!(recorder.current_sample_index(), 256);

        clock.advance(500_000);
        assert_eq!(recorder.current_sample_index(), 384);
    }
}
