//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failure is retryable (transport errors and timeouts only)
//! - Execute retries with exponential backoff + jitter
//! - Give the caller a hook between attempts (used for endpoint rotation)

use std::future::Future;

use crate::config::RetryConfig;
use crate::resilience::backoff::backoff_delay;
use crate::rpc::RpcError;

/// Run `op` until it succeeds, fails with a non-retryable error, or the attempt
/// ceiling is reached. `on_retry` observes every retryable failure before the
/// backoff sleep.
pub async fn retry_with_backoff<T, F, Fut, R>(
    policy: &RetryConfig,
    mut op: F,
    mut on_retry: R,
) -> Result<T, RpcError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, RpcError>>,
    R: FnMut(u32, &RpcError),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                on_retry(attempt, &e);
                attempt += 1;
                let delay = backoff_delay(policy, attempt);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after transient RPC failure"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
