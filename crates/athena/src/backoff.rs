//! Exponential backoff for throttled Athena calls.

use std::time::Duration;

/// Largest multiple of the time unit a single backoff sleep may reach.
pub const MAX_BACKOFF_UNITS: u64 = 60;

/// Retry budget and delay curve for throttling errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Throttled attempts allowed per job before giving up.
    pub max_retries: u32,
    /// Length of one backoff unit (one second in production).
    pub unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Sleep before retrying after the `attempt`-th throttle (1-based):
    /// `min(2^attempt, 60)` units.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.unit * backoff_units(attempt) as u32
    }

    /// Whether another attempt is allowed after `attempt` throttles.
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// `min(2^attempt, 60)` without overflowing for large attempts.
pub fn backoff_units(attempt: u32) -> u64 {
    1u64.checked_shl(attempt)
        .unwrap_or(u64::MAX)
        .min(MAX_BACKOFF_UNITS)
}
