//! JSON-RPC client with per-call endpoint resolution and timeouts.
//!
//! # Responsibilities
//! - Encode JSON-RPC 2.0 requests and decode typed results
//! - Resolve the active endpoint from the selector before each call
//! - Bound every request with the configured timeout
//! - Record per-method outcome metrics

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::validation::MAX_STATUS_BATCH;
use crate::health::EndpointSelector;
use crate::observability::metrics;
use crate::resilience::with_timeout;
use crate::rpc::types::{
    JsonRpcRequest, JsonRpcResponse, LatestBlockhash, RpcError, RpcResult, RpcSimulation,
    SignatureInfo, SignatureStatus, TokenAccount, WithContext,
};
use crate::rpc::ChainRpc;
use crate::transaction::{Checkpoint, Pubkey};

/// SPL token program, used to enumerate token accounts.
const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// JSON-RPC client bound to the endpoint selector.
pub struct JsonRpcClient {
    http: reqwest::Client,
    endpoints: Arc<EndpointSelector>,
    timeout: Duration,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `endpoints` - Selector consulted before every call
    /// * `timeout` - Deadline applied to each request
    pub fn new(endpoints: Arc<EndpointSelector>, timeout: Duration) -> RpcResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("wallet-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RpcError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoints,
            timeout,
            next_id: AtomicU64::new(1),
        })
    }

    /// The selector this client reads from.
    pub fn endpoints(&self) -> &Arc<EndpointSelector> {
        &self.endpoints
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> RpcResult<T> {
        let endpoint = self.endpoints.current();
        self.call_at(&endpoint.url, method, params).await
    }

    /// Issue a call against an explicit URL, bypassing the selector.
    pub async fn call_at<T: DeserializeOwned>(
        &self,
        url: &str,
        method: &str,
        params: Value,
    ) -> RpcResult<T> {
        let started = Instant::now();
        let result = with_timeout(self.timeout, url, self.execute(url, method, params)).await;

        metrics::record_rpc_call(method, result.is_ok(), started.elapsed());
        if let Err(e) = &result {
            tracing::debug!(url = %url, method, error = %e, "RPC call failed");
        }
        result
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        url: &str,
        method: &str,
        params: Value,
    ) -> RpcResult<T> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self.http.post(url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Http(status.as_u16()));
        }

        let envelope: JsonRpcResponse = response.json().await?;
        if let Some(error) = envelope.error {
            return Err(error.into());
        }

        // `"result": null` is a valid answer (unknown transaction, empty slot).
        let result = envelope.result.unwrap_or(Value::Null);
        serde_json::from_value(result).map_err(|e| RpcError::Decode(format!("{}: {}", method, e)))
    }
}

#[async_trait]
impl ChainRpc for JsonRpcClient {
    async fn get_health(&self) -> RpcResult<()> {
        let status: String = self.call("getHealth", json!([])).await?;
        if status == "ok" {
            Ok(())
        } else {
            Err(RpcError::Decode(format!("getHealth returned '{}'", status)))
        }
    }

    async fn get_balance(&self, owner: &Pubkey) -> RpcResult<u64> {
        let balance: WithContext<u64> = self
            .call("getBalance", json!([owner.to_string(), { "commitment": "confirmed" }]))
            .await?;
        Ok(balance.value)
    }

    async fn get_token_accounts_by_owner(&self, owner: &Pubkey) -> RpcResult<Vec<TokenAccount>> {
        let accounts: WithContext<Vec<TokenAccount>> = self
            .call(
                "getTokenAccountsByOwner",
                json!([
                    owner.to_string(),
                    { "programId": TOKEN_PROGRAM_ID },
                    { "encoding": "jsonParsed" }
                ]),
            )
            .await?;
        Ok(accounts.value)
    }

    async fn get_transaction(&self, hash: &str) -> RpcResult<Option<Value>> {
        self.call(
            "getTransaction",
            json!([hash, { "encoding": "json", "maxSupportedTransactionVersion": 0 }]),
        )
        .await
    }

    async fn get_latest_checkpoint(&self) -> RpcResult<Checkpoint> {
        let latest: WithContext<LatestBlockhash> = self
            .call("getLatestBlockhash", json!([{ "commitment": "finalized" }]))
            .await?;
        latest
            .value
            .blockhash
            .parse()
            .map_err(|e| RpcError::Decode(format!("getLatestBlockhash: {}", e)))
    }

    async fn simulate_transaction(&self, wire_base64: &str) -> RpcResult<RpcSimulation> {
        let simulation: WithContext<RpcSimulation> = self
            .call(
                "simulateTransaction",
                json!([
                    wire_base64,
                    {
                        "encoding": "base64",
                        "sigVerify": false,
                        "replaceRecentBlockhash": true,
                        "commitment": "confirmed"
                    }
                ]),
            )
            .await?;
        Ok(simulation.value)
    }

    async fn send_transaction(&self, wire_base64: &str) -> RpcResult<String> {
        self.call(
            "sendTransaction",
            json!([
                wire_base64,
                { "encoding": "base64", "preflightCommitment": "confirmed" }
            ]),
        )
        .await
    }

    async fn get_signature_statuses(
        &self,
        hashes: &[String],
    ) -> RpcResult<Vec<Option<SignatureStatus>>> {
        let mut statuses = Vec::with_capacity(hashes.len());
        for chunk in hashes.chunks(MAX_STATUS_BATCH) {
            let batch: WithContext<Vec<Option<SignatureStatus>>> = self
                .call(
                    "getSignatureStatuses",
                    json!([chunk, { "searchTransactionHistory": true }]),
                )
                .await?;
            if batch.value.len() != chunk.len() {
                return Err(RpcError::Decode(format!(
                    "getSignatureStatuses: asked for {} statuses, got {}",
                    chunk.len(),
                    batch.value.len()
                )));
            }
            statuses.extend(batch.value);
        }
        Ok(statuses)
    }

    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> RpcResult<Vec<SignatureInfo>> {
        self.call(
            "getSignaturesForAddress",
            json!([address.to_string(), { "limit": limit }]),
        )
        .await
    }
}

impl std::fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcClient")
            .field("endpoint", &self.endpoints.current().url)
            .field("timeout_ms", &self.timeout.as_millis())
            .finish()
    }
}
