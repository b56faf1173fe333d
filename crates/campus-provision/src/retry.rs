//! Bounded-retry primitive
//!
//! Generic retry loop with exponential backoff and an injectable
//! sleeper, so polling logic is unit-testable without real delays. The
//! provisioner builds its attribute-availability poller on top of it.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// How a retried operation ultimately failed.
#[derive(Debug)]
pub enum RetryFailure<E> {
    /// Every attempt failed with a retryable error.
    Exhausted {
        /// Attempts consumed.
        attempts: u32,
        /// The error from the final attempt.
        last_error: E,
    },
    /// An attempt failed with a non-retryable error; no further
    /// attempts were made.
    NonRetryable(E),
}

/// Attempt budget and backoff schedule.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub multiplier: f64,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    /// The attribute-availability policy: 7 attempts, 500 ms initial
    /// delay, ×1.5 backoff capped at 5 s.
    fn default() -> Self {
        Self {
            max_attempts: 7,
            initial_delay: Duration::from_millis(500),
            multiplier: 1.5,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Run `operation` until it succeeds, a non-retryable error
    /// occurs, or the attempt budget is exhausted. `retryable` decides
    /// whether an error is worth another attempt; sleeps happen
    /// between attempts only.
    pub async fn run<T, E, F, Fut>(
        &self,
        sleeper: &dyn Sleeper,
        mut operation: F,
        retryable: impl Fn(&E) -> bool,
    ) -> Result<T, RetryFailure<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if !retryable(&error) => {
                    return Err(RetryFailure::NonRetryable(error));
                }
                Err(error) => {
                    if attempt >= self.max_attempts {
                        return Err(RetryFailure::Exhausted {
                            attempts: attempt,
                            last_error: error,
                        });
                    }
                    sleeper.sleep(delay).await;
                    delay = delay.mul_f64(self.multiplier).min(self.max_delay);
                }
            }
        }
    }
}

/// Injectable delay source.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend the current task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sleeper that returns immediately. For tests and local backends
/// where real backoff delays serve no purpose.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSleeper;

#[async_trait]
impl Sleeper for NoopSleeper {
    async fn sleep(&self, _duration: Duration) {}
}
