//! Timeout enforcement.
//!
//! Wraps a single RPC future with a deadline and converts expiry into a typed
//! [`RpcError::Timeout`] that carries the endpoint it was aimed at.

use std::future::Future;
use std::time::Duration;

use crate::rpc::RpcError;

/// Run `fut` with a deadline of `limit`.
pub async fn with_timeout<T, F>(limit: Duration, endpoint: &str, fut: F) -> Result<T, RpcError>
where
    F: Future<Output = Result<T, RpcError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(RpcError::Timeout {
            endpoint: endpoint.to_string(),
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}
