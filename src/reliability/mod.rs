//! Timeouts and bounded retries for collaborator calls.
//!
//! Every call to the embedder, the trial index or a verifier goes through [`call_with_retry`]:
//! each attempt is bounded by [`RetryPolicy::call_timeout`], and retryable failures are retried
//! with exponential backoff until [`RetryPolicy::max_attempts`] is reached.


use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::constants::{DEFAULT_CALL_TIMEOUT_MS, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BACKOFF_MS};

/// Upper bound on a single backoff sleep.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Errors a collaborator call can fail with.
pub trait Retryable: Sized {
    /// Whether another attempt could succeed.
    fn is_retryable(&self) -> bool;

    /// Error reported when an attempt exceeds its timeout.
    fn timed_out(after: Duration) -> Self;
}

/// How collaborator calls are bounded and retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles after each failed attempt.
    pub backoff: Duration,
    /// Per-attempt timeout.
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            call_timeout: Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS),
        }
    }
}

impl RetryPolicy {
    /// Single attempt with the given timeout.
    pub fn no_retry(call_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
            call_timeout,
        }
    }

    /// Sleep before retry number `attempt` (1-based count of failures so far).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

/// Runs `op` under `policy`, returning the first success or the last failure.
///
/// Non-retryable errors are returned immediately. Timeouts count as retryable.
pub async fn call_with_retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let err = match tokio::time::timeout(policy.call_timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => err,
            Err(_) => E::timed_out(policy.call_timeout),
        };

        if !err.is_retryable() || attempt >= max_attempts {
            return Err(err);
        }

        let delay = policy.delay_for(attempt);
        warn!(
            call = label,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Collaborator call failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
