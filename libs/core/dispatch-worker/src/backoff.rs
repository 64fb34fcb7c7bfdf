//! Exponential backoff between attempts.

use std::time::Duration;

/// Default delay unit.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default upper bound for a single wait.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// `delay(n) = min(base * 2^n, max)` where `n` is the number of failures so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Wait before the next attempt after `failures` failed attempts.
    ///
    /// Saturates at `max` instead of overflowing.
    pub fn delay(&self, failures: u32) -> Duration {
        2u32.checked_pow(failures)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }
}
