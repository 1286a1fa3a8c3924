use rand::Rng;
use std::time::Duration;

/// Exponential backoff for retrying a provider after a transient failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// `base * 2^attempt`, capped at `max`
    pub fn next_delay(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }

    /// `next_delay` with "equal jitter": uniform in `[delay / 2, delay]`
    pub fn next_delay_with_jitter<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let delay = self.next_delay(attempt);
        let upper = delay.as_millis() as u64;
        if upper == 0 {
            return delay;
        }
        Duration::from_millis(rng.random_range(upper / 2..=upper))
    }
}
