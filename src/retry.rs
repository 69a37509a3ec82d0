//! Bounded retries and per-call timeouts for store operations.

use std::future::Future;
use std::time::Duration;

use crate::store::StoreError;

/// How long to wait between attempts.
#[derive(Clone, Debug, Default)]
pub enum BackoffStrategy {
    #[default]
    Fixed,
    /// `min(base * 2^attempt + jitter, max)`, jitter up to half the base.
    ExponentialWithJitter { base_ms: u64, max_ms: u64 },
}

/// Attempt budget for one store call. `max_attempts` counts the first try.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: BackoffStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
            backoff: BackoffStrategy::Fixed,
        }
    }
}

impl RetryConfig {
    /// Backoff suited to throttling object stores.
    pub fn exponential(max_attempts: u32, base_ms: u64, max_ms: u64) -> Self {
        Self {
            max_attempts,
            delay: Duration::from_millis(base_ms),
            backoff: BackoffStrategy::ExponentialWithJitter { base_ms, max_ms },
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
            backoff: BackoffStrategy::Fixed,
        }
    }

    /// Wait before retry number `attempt + 1`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match &self.backoff {
            BackoffStrategy::Fixed => self.delay,
            BackoffStrategy::ExponentialWithJitter { base_ms, max_ms } => {
                let base = base_ms.saturating_mul(2_u64.saturating_pow(attempt));
                let total = base.saturating_add(jitter_up_to(base / 2)).min(*max_ms);
                Duration::from_millis(total)
            }
        }
    }
}

fn jitter_up_to(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    use rand::Rng;
    rand::thread_rng().gen_range(0..=max)
}

/// Failures that may succeed if the same call is made again.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

/// Repeat `operation` while it fails transiently and attempts remain.
/// A permanent failure is returned immediately.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                let delay = config.delay_for_attempt(attempt);
                tracing::debug!(
                    attempt = attempt + 1,
                    max = attempts,
                    delay_ms = delay.as_millis() as u64,
                    "store call failed transiently, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Bound a single store call. An elapsed call is a `StoreError::Timeout`,
/// never an implicit success.
pub async fn with_timeout<T, Fut>(limit: Duration, call: Fut) -> Result<T, StoreError>
where
    Fut: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}

/// Run a store call under both policies: each attempt is bounded by `limit`
/// and transient failures are retried per `config`.
pub async fn with_policy<T, F, Fut>(
    config: &RetryConfig,
    limit: Duration,
    mut call: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    with_retry(config, || with_timeout(limit, call())).await
}
