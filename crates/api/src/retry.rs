use crate::error::{ApiError, Result};
use backoff::{backoff::Backoff, ExponentialBackoff};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Retry policy applied by [`crate::ApiClient`] to throttled and 5xx responses.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A policy that sends every request exactly once.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            randomization_factor: 0.1,
            multiplier: self.multiplier,
            max_interval: self.max_interval,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent. Waiting between attempts stops early when `ctx` fires.
pub async fn retry_with_backoff<F, Fut, T>(
    config: &RetryConfig,
    ctx: &CancellationToken,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut backoff = config.backoff();
    let mut attempts = 0;

    loop {
        attempts += 1;
        debug!(attempt = attempts, "Executing request");

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    debug!(attempts, "Request succeeded after retries");
                }
                return Ok(result);
            }
            Err(err) if err.is_retryable() && attempts < max_attempts => {
                let Some(wait) = backoff.next_backoff() else {
                    return Err(ApiError::Timeout { attempts });
                };
                warn!(
                    error = %err,
                    attempt = attempts,
                    wait_ms = wait.as_millis(),
                    "Request failed, retrying"
                );
                tokio::select! {
                    _ = ctx.cancelled() => return Err(ApiError::Cancelled),
                    _ = tokio::time::sleep(wait) => {}
                }
            }
            Err(err) => {
                if attempts > 1 && err.is_retryable() {
                    warn!(attempts, "Max retries exceeded");
                }
                return Err(err);
            }
        }
    }
}
