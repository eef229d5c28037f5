//! Caller-side retries. The session itself attempts every call exactly once;
//! this helper wraps idempotent verbs when a caller wants more.

use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::Method;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::Result;

#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Retries after the first attempt; `3` means up to four calls.
    pub max_retries: usize,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
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

pub fn is_idempotent(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::PUT | Method::DELETE)
}

/// Retry transport failures of GET, PUT and DELETE. Any other method runs once.
pub async fn retry_idempotent<F, Fut, T>(config: &RetryConfig, method: &Method, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    if !is_idempotent(method) {
        return operation().await;
    }

    let mut backoff = config.backoff();
    let mut attempts = 0;

    loop {
        attempts += 1;
        debug!(attempt = attempts, method = %method, "Executing request");

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    debug!(attempts, "Request succeeded after retries");
                }
                return Ok(result);
            }
            Err(err) if err.is_retryable() && attempts <= config.max_retries => {
                match backoff.next_backoff() {
                    Some(wait) => {
                        warn!(
                            error = %err,
                            attempt = attempts,
                            wait_ms = wait.as_millis(),
                            "Request failed, retrying"
                        );
                        tokio::time::sleep(wait).await;
                    }
                    None => return Err(err),
                }
            }
            Err(err) => {
                if attempts > config.max_retries {
                    warn!(attempts, "Max retries exceeded");
                }
                return Err(err);
            }
        }
    }
}
