//! Request pacing.
//!
//! A fixed base delay plus bounded random jitter inserted after each fetch,
//! so the request cadence never looks mechanical.

use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// Post-request delay: base plus a uniform random jitter in `[0, jitter]`.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    base: Duration,
    jitter: Duration,
}

impl Pacer {
    /// Create a pacer from base and maximum-jitter durations.
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self { base, jitter }
    }

    /// Create a pacer from millisecond values.
    pub fn new_millis(base_ms: u64, jitter_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(base_ms),
            Duration::from_millis(jitter_ms),
        )
    }

    /// A pacer that never sleeps, for tests and dry runs.
    pub fn none() -> Self {
        Self::new_millis(0, 0)
    }

    /// Delay that will be applied next, with jitter already drawn.
    fn next_delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.base;
        }
        let drawn = rand::thread_rng().gen_range(0..=jitter_ms);
        self.base + Duration::from_millis(drawn)
    }

    /// Sleep for the paced delay.
    pub async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}
