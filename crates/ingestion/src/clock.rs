//! Runtime clock on tokio time

use contracts::{MonotonicClock, TimestampUs};
use tokio::time::Instant;

/// Monotonic clock backed by `tokio::time::Instant`
///
/// Follows the runtime's clock, so paused-time tests advance it too.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeClock {
    origin: Instant,
}

impl RuntimeClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn origin(&self) -> Instant {
        self.origin
    }
}

impl Default for RuntimeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for RuntimeClock {
    fn now_us(&self) -> TimestampUs {
        self.origin.elapsed().as_micros() as TimestampUs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_follows_paused_time() {
        let clock = RuntimeClock::new();
        assert_eq!(clock.now_us(), 0);
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(clock.now_us(), 250_000);
    }
}
