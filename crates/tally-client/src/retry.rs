//! Retry policy
//!
//! Decides whether a failed attempt gets another dispatch and how long to
//! wait first. Only transient failures qualify, only requests that are
//! safe to repeat are retried, and the attempt count bounds total
//! dispatches including the first one.

use std::time::Duration;

use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Whether failed attempt number `attempt` (zero-based) should be
    /// followed by another dispatch. `retry_safe` is the request's own
    /// claim that repeating it cannot double-apply an effect.
    pub fn should_retry(&self, attempt: u32, error: &ApiError, retry_safe: bool) -> bool {
        if !retry_safe {
            return false;
        }
        if attempt + 1 >= self.max_attempts {
            return false;
        }
        matches!(
            error,
            ApiError::Network { .. } | ApiError::Server { .. }
        )
    }

    /// Delay before the dispatch that follows failed attempt `attempt`:
    /// base * 2^attempt, capped at the configured maximum.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        let delay_ms = base_ms
            .saturating_mul(2u64.saturating_pow(attempt))
            .min(max_ms);
        Duration::from_millis(delay_ms)
    }
}
