//! Chain RPC subsystem.
//!
//! # Data Flow
//! ```text
//! Coordinator / monitors
//!     → ChainRpc trait (this module)
//!     → client.rs (JSON-RPC 2.0 over HTTPS)
//!         → reads the active endpoint from health::EndpointSelector on every call
//!         → resilience::with_timeout around each request
//!     → types.rs (envelope, typed results, RpcError)
//! ```
//!
//! # Design Decisions
//! - The endpoint is resolved per call, never cached by callers
//! - Chain-reported errors are surfaced typed and never retried here
//! - Consumers depend on the trait so tests can script responses

pub mod client;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use serde_json::Value;

use crate::transaction::{Checkpoint, Pubkey};

pub use client::JsonRpcClient;
pub use types::{
    Commitment, RpcError, RpcResult, RpcSimulation, SignatureInfo, SignatureStatus, TokenAccount,
};

/// Network methods consumed by the wallet core.
///
/// Every method targets whichever endpoint is active at the time of the call.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Lightweight liveness probe (`getHealth`).
    async fn get_health(&self) -> RpcResult<()>;

    /// Native balance in the smallest unit.
    async fn get_balance(&self, owner: &Pubkey) -> RpcResult<u64>;

    /// Token accounts owned by `owner`.
    async fn get_token_accounts_by_owner(&self, owner: &Pubkey) -> RpcResult<Vec<TokenAccount>>;

    /// Full transaction by network hash, `None` if unknown.
    async fn get_transaction(&self, hash: &str) -> RpcResult<Option<Value>>;

    /// Most recent finalized checkpoint.
    async fn get_latest_checkpoint(&self) -> RpcResult<Checkpoint>;

    /// Dry-run a base64 wire transaction. Signatures are not verified.
    async fn simulate_transaction(&self, wire_base64: &str) -> RpcResult<RpcSimulation>;

    /// Broadcast a base64 wire transaction; returns the network hash.
    async fn send_transaction(&self, wire_base64: &str) -> RpcResult<String>;

    /// Status per hash, in request order. Implementations split large requests
    /// into chain-sized batches.
    async fn get_signature_statuses(&self, hashes: &[String])
        -> RpcResult<Vec<Option<SignatureStatus>>>;

    /// Signature history for an address, newest first.
    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> RpcResult<Vec<SignatureInfo>>;
}
