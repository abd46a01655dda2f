//! Bounded retry with exponential backoff.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::TransportError;

/// Retry policy applied by the transport to unavailability errors.
///
/// Timeouts are not retried: the caller's deadline has already been spent.
/// Retries share that deadline, so a retry whose backoff would overrun it is
/// not attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_backoff_ms: 100,
            max_backoff_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Whether `attempt` (1-based) that failed with `err` should be retried.
    pub fn should_retry(&self, attempt: u32, err: &TransportError) -> bool {
        attempt < self.max_attempts
            && matches!(
                err,
                TransportError::Unavailable { .. } | TransportError::NoResponder { .. }
            )
    }

    /// Delay before attempt `attempt + 1`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}
