//! Bounded retries for eventual-consistency races.
//!
//! Some mutations fail for a short while after a trust relationship they
//! depend on was created, e.g. a fresh cloud role that the remote worker
//! cannot assume yet. The propagation delay is roughly constant, so the retry
//! uses a fixed delay with no backoff or jitter, and only errors the caller
//! recognises as that race are retried.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ProviderError;

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Sleep between two attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::trust_propagation()
    }
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` of zero is treated as one.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Five attempts ten seconds apart, enough for cloud role propagation.
    pub fn trust_propagation() -> Self {
        Self::new(5, Duration::from_secs(10))
    }

    /// Longest total time spent sleeping.
    pub fn max_total_delay(&self) -> Duration {
        self.delay
            .saturating_mul(self.max_attempts.max(1).saturating_sub(1))
    }
}

/// Position inside one retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Attempt {
    index: u32,
    max: u32,
    delay: Duration,
}

impl Attempt {
    fn first(policy: &RetryPolicy) -> Self {
        Self {
            index: 1,
            max: policy.max_attempts.max(1),
            delay: policy.delay,
        }
    }

    fn has_next(&self) -> bool {
        self.index < self.max
    }
}

/// Run `operation` until it succeeds, fails with an error `is_retryable`
/// rejects, or the policy runs out of attempts.
///
/// Returns the last error once attempts are exhausted. The sleep between
/// attempts cannot be interrupted.
pub async fn retry_matching<T, F, Fut, P>(
    policy: &RetryPolicy,
    is_retryable: P,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
    P: Fn(&ProviderError) -> bool,
{
    let mut attempt = Attempt::first(policy);

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_retryable(&err) {
            debug!(attempt = attempt.index, error = %err, "error is not retryable");
            return Err(err);
        }
        if !attempt.has_next() {
            warn!(attempts = attempt.index, error = %err, "retries exhausted");
            return Err(err);
        }

        warn!(
            attempt = attempt.index,
            max_attempts = attempt.max,
            delay = ?attempt.delay,
            error = %err,
            "retrying after consistency error"
        );
        tokio::time::sleep(attempt.delay).await;
        attempt.index += 1;
    }
}

/// Retry predicate for errors the classifier marks as transient.
pub fn is_transient(err: &ProviderError) -> bool {
    err.is_transient()
}

/// Retry predicate for errors whose message contains `needle`
/// (case-insensitive).
pub fn message_contains(needle: &str) -> impl Fn(&ProviderError) -> bool + '_ {
    move |err| {
        err.to_string()
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }
}
