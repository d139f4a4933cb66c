//! JSON-RPC 2.0 envelope, typed results and error definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while talking to an RPC endpoint.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// No response within the per-call deadline.
    #[error("endpoint {endpoint} timed out after {timeout_ms} ms")]
    Timeout { endpoint: String, timeout_ms: u64 },

    /// Connection refused, reset, TLS failure and similar transport problems.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status.
    #[error("HTTP status {0}")]
    Http(u16),

    /// The endpoint answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Response {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// The response could not be decoded into the expected shape.
    #[error("malformed RPC response: {0}")]
    Decode(String),
}

impl RpcError {
    /// Transport failures, timeouts, throttling and 5xx may succeed on retry or on
    /// another endpoint. Errors reported by the chain itself never will.
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Timeout { .. } | RpcError::Transport(_) => true,
            RpcError::Http(status) => *status == 429 || *status >= 500,
            RpcError::Response { .. } | RpcError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RpcError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            RpcError::Http(status.as_u16())
        } else {
            RpcError::Transport(e.to_string())
        }
    }
}

/// Result type for RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;

/// JSON-RPC 2.0 request.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcErrorObject>,
}

/// JSON-RPC error object.
#[derive(Debug, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl From<JsonRpcErrorObject> for RpcError {
    fn from(e: JsonRpcErrorObject) -> Self {
        RpcError::Response {
            code: e.code,
            message: e.message,
            data: e.data,
        }
    }
}

/// `{ "context": {...}, "value": T }` wrapper used by most chain methods.
#[derive(Debug, Deserialize)]
pub struct WithContext<T> {
    pub value: T,
}

/// Result of `getLatestBlockhash`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestBlockhash {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

/// Result of `simulateTransaction`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcSimulation {
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub logs: Option<Vec<String>>,
    #[serde(default)]
    pub units_consumed: Option<u64>,
}

/// Commitment reached by a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

/// One entry of `getSignatureStatuses`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    /// `None` once the transaction is rooted.
    #[serde(default)]
    pub confirmations: Option<u64>,
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub confirmation_status: Option<Commitment>,
}

/// One entry of `getSignaturesForAddress`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    pub slot: u64,
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub confirmation_status: Option<Commitment>,
}

/// One entry of `getTokenAccountsByOwner`. The account body is left as parsed JSON.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenAccount {
    pub pubkey: String,
    pub account: Value,
}

/// Render a chain-reported error value as a human-readable message.
pub fn describe_chain_error(err: &Value) -> String {
    match err {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
