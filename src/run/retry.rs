use std::time::Duration;

use crate::config::RetryConfig;
use crate::delivery::DeliveryOutcome;

/// Bounded retry budget for delivery within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Policy that retries without sleeping
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Determines if another attempt should follow `outcome`.
    ///
    /// Only retryable failures are re-attempted, and only while attempts remain.
    pub fn should_retry(&self, outcome: &DeliveryOutcome, attempts_made: u32) -> bool {
        outcome.is_retryable() && attempts_made < self.max_attempts
    }

    /// Calculates exponential backoff before retry number `retry_count`.
    ///
    /// Formula: base * 2^(retry_count-1), capped at max_delay
    ///
    /// With base=2s, max=30s:
    /// - Retry 1: 2s
    /// - Retry 2: 4s
    /// - Retry 3: 8s
    /// - Retry 5+: 30s (capped)
    pub fn backoff(&self, retry_count: u32) -> Duration {
        if retry_count == 0 {
            return Duration::ZERO;
        }

        let multiplier = 2u32.saturating_pow(retry_count - 1);
        self.base_delay.saturating_mul(multiplier).min(self.max_delay)
    }

    /// Delay before retry number `retry_count`, honoring a server `retry_after` hint
    /// up to `max_delay`.
    pub fn delay_for(&self, retry_count: u32, retry_after: Option<Duration>) -> Duration {
        let backoff = self.backoff(retry_count);
        match retry_after {
            Some(hint) => backoff.max(hint).min(self.max_delay),
            None => backoff,
        }
    }
}
