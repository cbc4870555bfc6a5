//! Delay between stage attempts.
//!
//! The attempt budget belongs to each stage (`max_attempts`); this module only
//! decides how long to wait before re-invoking. The default is no delay.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base
    #[default]
    Constant,
    /// delay = base * failed_attempts
    Linear,
    /// delay = base * 2^(failed_attempts - 1)
    Exponential,
}

/// Configuration for the delay between attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Base delay between attempts in milliseconds.
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Backoff strategy.
    pub backoff_strategy: BackoffStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 0,
            max_delay_ms: 30_000,
            backoff_strategy: BackoffStrategy::Constant,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config with no delay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff_strategy = strategy;
        self
    }

    /// Returns the delay before the next attempt, given how many attempts
    /// have failed so far (1-indexed).
    #[must_use]
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        let base = self.base_delay_ms;
        let n = failed_attempts.max(1);

        let delay = match self.backoff_strategy {
            BackoffStrategy::Constant => base,
            BackoffStrategy::Linear => base.saturating_mul(u64::from(n)),
            BackoffStrategy::Exponential => {
                base.saturating_mul(2u64.saturating_pow(n - 1))
            }
        };

        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}
