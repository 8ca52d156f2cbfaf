//! Exponential backoff shared by the listing fetch and the metadata calls.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};

use crate::config::RetryConfig;
use crate::error::FetchError;

/// How often, and how patiently, a network operation is re-attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            multiplier: 2,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            multiplier: config.multiplier.max(1),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// A policy that never waits between attempts.
    #[cfg(test)]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            multiplier: 1,
            max_delay: Duration::ZERO,
        }
    }

    /// Wait before retry number `retry` (1-based): `initial * multiplier^(retry-1)`, capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self
            .multiplier
            .checked_pow(retry.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent.
    ///
    /// A retryable failure on the final attempt is reported as
    /// [`FetchError::RetriesExhausted`]; a non-retryable one is returned as is.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{label}: attempt {attempt}/{} failed ({e}), retrying in {:.1}s...",
                        self.max_attempts,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_retryable() => {
                    return Err(FetchError::RetriesExhausted {
                        label: label.to_string(),
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    debug!("{label}: not retrying after error: {e}");
                    return Err(e);
                }
            }
        }
    }
}
