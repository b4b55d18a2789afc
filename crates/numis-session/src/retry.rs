// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded exponential backoff for transient upstream failures.

use std::future::Future;
use std::time::Duration;

use numis_config::model::{ArchiveConfig, RetryConfig};
use numis_core::NumisError;
use tokio::time::sleep;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    /// Never retry.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (1-based): base, 2*base, 4*base, ...
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_backoff.saturating_mul(1 << shift)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.base_backoff())
    }
}

impl From<&ArchiveConfig> for RetryPolicy {
    fn from(config: &ArchiveConfig) -> Self {
        Self::new(config.max_attempts, config.base_backoff())
    }
}

/// Whole milliseconds of `duration` for log fields, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are spent.
///
/// Only errors for which [`NumisError::is_retryable`] holds are retried;
/// `Conflict` and friends return immediately.
pub async fn with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut op: F,
) -> Result<T, NumisError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, NumisError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempt >= policy.max_attempts => {
                error!(operation, attempts = attempt, error = %e, "giving up after retries");
                return Err(e);
            }
            Err(e) => {
                let backoff = policy.backoff_for(attempt);
                warn!(
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    backoff_ms = millis(backoff),
                    error = %e,
                    "transient failure, retrying after backoff"
                );
                sleep(backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn millis_saturates() {
        assert_eq!(millis(Duration::from_millis(250)), 250);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    fn unavailable() -> NumisError {
        NumisError::UpstreamUnavailable {
            service: "storage",
            message: "busy".into(),
        }
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::new(5, Duration::from_millis(10));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(10));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(20));
        assert_eq!(policy.backoff_for(4), Duration::from_millis(80));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let result = with_backoff(&policy, "test", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(unavailable())
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn surfaces_error_when_attempts_are_spent() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, Duration::from_millis(10));
        let result: Result<(), _> = with_backoff(&policy, "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(unavailable())
        })
        .await;
        assert!(result.unwrap_err().is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn conflicts_are_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, Duration::from_millis(10));
        let result: Result<(), _> = with_backoff(&policy, "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(NumisError::not_found("request", "r"))
        })
        .await;
        assert!(matches!(result, Err(NumisError::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
