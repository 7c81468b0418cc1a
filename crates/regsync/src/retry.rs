//! Bounded, cancellable retry of transient failures.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Base delay for exponential backoff (in seconds).
const RETRY_BASE_DELAY_SECS: u64 = 2;

/// Errors that can tell whether another attempt might succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Marker for an operation abandoned because the run was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `0` disables retrying.
    pub max_retries: u32,
    /// Fixed delay between attempts. `None` uses exponential backoff (2s, 4s, 8s, ...).
    pub delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: None,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Option<Duration>) -> Self {
        Self { max_retries, delay }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::new(0, None)
    }

    /// Delay before retry number `attempt + 1`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.delay
            .unwrap_or_else(|| Duration::from_secs(RETRY_BASE_DELAY_SECS << attempt.min(16)))
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// the retry budget is exhausted.
///
/// Cancellation aborts an in-flight attempt with [`Cancelled`]; cancellation
/// during the inter-attempt delay returns the last error.
pub async fn retry_if_necessary<T, E, F, Fut>(
    cancel: &CancellationToken,
    policy: &RetryPolicy,
    what: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + From<Cancelled> + Display,
{
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(Cancelled.into());
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Cancelled.into()),
            result = operation() => result,
        };

        let err = match result {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if attempt >= policy.max_retries || !err.is_retryable() {
            return Err(err);
        }

        let delay = policy.delay_for(attempt);
        attempt += 1;
        warn!(
            "{} failed: {}. Retrying (attempt {}/{}) after {:?}...",
            what,
            err,
            attempt + 1,
            policy.max_retries + 1,
            delay
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(err),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
