//! Bounded retries for content-store calls.

use std::future::Future;
use std::time::Duration;

use crate::content_store::ContentStoreError;
use crate::error::{KernelError, Result};

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay every time.
    Fixed,
    /// Delay doubles each attempt, capped at `max_backoff`.
    Exponential,
}

/// Retry budget for calls to the content store.
///
/// Only [`ContentStoreError::Transient`] is retried. Everything else fails
/// immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
    pub strategy: Backoff,
}

impl RetryPolicy {
    /// Three attempts, fixed delay.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: delay,
            max_backoff: delay,
            strategy: Backoff::Fixed,
        }
    }

    /// Three attempts, doubling from `initial` up to `max`.
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: initial,
            max_backoff: max,
            strategy: Backoff::Exponential,
        }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::fixed(Duration::ZERO).with_max_attempts(1)
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_max_backoff(mut self, max: Duration) -> Self {
        self.max_backoff = max;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let delay = match self.strategy {
            Backoff::Fixed => self.initial_backoff,
            Backoff::Exponential => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                self.initial_backoff.saturating_mul(factor)
            }
        };
        delay.min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails non-transiently, or the budget is
    /// spent.
    ///
    /// Exhausting the budget yields [`KernelError::StorageFatal`] carrying
    /// the attempt count and the last transient error.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, ContentStoreError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(operation, attempt, "content store call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient content store failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(operation, attempt, error = %e, "content store call failed");
                    return Err(KernelError::StorageFatal {
                        attempts: attempt,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    /// Three attempts one second apart.
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1))
    }
}
