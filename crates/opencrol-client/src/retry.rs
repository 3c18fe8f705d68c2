//! Retry policy with capped exponential backoff

use std::time::Duration;

/// Default number of attempts per request
pub const MAX_RETRIES: u32 = 3;

/// Delay before the first retry
pub const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Upper bound for any single delay
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

/// How many times to attempt a request and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (0 behaves as 1)
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
        }
    }

    /// A policy that sends every request once
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Number of attempts actually made
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Delay after the failed attempt `attempt` (counted from 0)
    ///
    /// `min(initial_delay * 2^attempt, max_delay)`, saturating on overflow.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(MAX_RETRIES, INITIAL_RETRY_DELAY, MAX_RETRY_DELAY)
    }
}
