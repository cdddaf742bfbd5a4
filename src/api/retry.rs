//! Retry policy for GitHub API calls
//!
//! Transport failures back off exponentially. Secondary rate-limit errors
//! that carry a server delay wait exactly that long instead.

use crate::api::error::ApiError;
use crate::config::RetryConfig;
use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::Duration;

/// Explicit retry policy: attempt ceiling plus a capped doubling backoff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Wait after the first failure
    pub base_delay: Duration,
    /// Upper bound for any computed backoff
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
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
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Exponential backoff after the `attempt`-th failure (1-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Wait before retrying after `err` on the `attempt`-th failure
    pub fn delay_for(&self, attempt: u32, err: &ApiError) -> Duration {
        err.retry_after()
            .unwrap_or_else(|| self.backoff_delay(attempt))
    }

    /// Backoff schedule handed to `backon`: one retry less than the attempt
    /// ceiling, doubling from `base_delay`, no jitter
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or exhausts the attempt ceiling; the last error is returned
    ///
    /// # Arguments
    ///
    /// * `label` - Identifies the operation in log lines (usually the query)
    /// * `operation` - Produces a fresh future for every attempt
    pub async fn run<T, F, Fut>(&self, label: &str, operation: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        operation
            .retry(self.backoff())
            .when(ApiError::is_retryable)
            // Server-supplied delays replace the computed backoff exactly
            .adjust(|err: &ApiError, delay: Option<Duration>| {
                delay.map(|d| err.retry_after().unwrap_or(d))
            })
            .notify(|err: &ApiError, delay: Duration| {
                tracing::warn!("{} failed, retrying in {:?}: {}", label, delay, err);
            })
            .await
    }
}
