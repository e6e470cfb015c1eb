//! Retry/backoff policy for model requests

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Exponential backoff with additive jitter
///
/// Delay before attempt `n + 1` is `base-delay-ms × 2^(n-1) + jitter`, jitter
/// drawn uniformly from `0..=max-jitter-ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    #[serde(rename = "base-delay-ms")]
    pub base_delay_ms: u64,

    #[serde(rename = "max-jitter-ms")]
    pub max_jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_jitter_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// No delay between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_jitter_ms: 0,
        }
    }

    /// Deterministic part of the delay after a failed 1-based `attempt`
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << exponent))
    }

    /// Full delay after a failed 1-based `attempt`, jitter included
    pub fn backoff(&self, attempt: u32) -> Duration {
        let jitter = if self.max_jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=self.max_jitter_ms)
        };
        self.base_backoff(attempt) + Duration::from_millis(jitter)
    }
}
