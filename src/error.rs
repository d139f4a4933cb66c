//! Errors surfaced by the wallet core.
//!
//! Validation, balance, simulation and risk errors stop a submission before
//! anything irreversible happens. Endpoint timeouts are retried with backoff and
//! rotation before a broadcast error is reported. Signing errors are fatal for
//! the wallet until its phrase is re-imported.

use thiserror::Error;

use crate::risk::RiskAssessment;
use crate::rpc::RpcError;
use crate::store::StoreError;
use crate::transaction::BuildError;
use crate::vault::VaultError;

#[derive(Debug, Error)]
pub enum WalletError {
    /// Malformed address, non-positive or sub-minimum amount, bad phrase.
    #[error("{0}")]
    Validation(String),

    #[error("insufficient balance: {required} needed including fees, {available} available")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("transaction would fail: {message}")]
    SimulationFailure { message: String, logs: Vec<String> },

    #[error("recipient address looks unsafe ({} risk)", .0.level)]
    RiskBlocked(RiskAssessment),

    #[error("signing failed: {0}; re-import the recovery phrase for this wallet")]
    Signing(String),

    #[error("transaction was not accepted: {0}")]
    Broadcast(String),

    #[error("network endpoint {endpoint} is temporarily unavailable, retrying")]
    EndpointTimeout { endpoint: String, timeout_ms: u64 },

    #[error("transaction status temporarily unavailable, retrying: {0}")]
    ConfirmationPoll(String),

    /// Any other RPC failure outside the broadcast step.
    #[error("network request failed: {0}")]
    Rpc(RpcError),

    #[error("secure key storage failed: {0}")]
    KeyStorage(#[from] VaultError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// The network accepted the transaction but it has no local record, so the
    /// confirmation monitor will not track it.
    #[error("transaction {hash} was broadcast but could not be recorded ({source}); check its status before retrying")]
    Unrecorded { hash: String, source: StoreError },

    #[error("operation cancelled")]
    Cancelled,

    #[error("no active wallet; create or import one first")]
    NoActiveWallet,
}

impl WalletError {
    /// Errors that go away on their own and are worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            WalletError::EndpointTimeout { .. } | WalletError::ConfirmationPoll(_) => true,
            WalletError::Rpc(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WalletError::Validation(_) => "validation",
            WalletError::InsufficientBalance { .. } => "insufficient_balance",
            WalletError::SimulationFailure { .. } => "simulation_failure",
            WalletError::RiskBlocked(_) => "risk_blocked",
            WalletError::Signing(_) => "signing",
            WalletError::Broadcast(_) => "broadcast",
            WalletError::EndpointTimeout { .. } => "endpoint_timeout",
            WalletError::ConfirmationPoll(_) => "confirmation_poll",
            WalletError::Rpc(_) => "rpc",
            WalletError::KeyStorage(_) => "key_storage",
            WalletError::Storage(_) => "storage",
            WalletError::Unrecorded { .. } => "unrecorded",
            WalletError::Cancelled => "cancelled",
            WalletError::NoActiveWallet => "no_active_wallet",
        }
    }
}

impl From<RpcError> for WalletError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::Timeout {
                endpoint,
                timeout_ms,
            } => WalletError::EndpointTimeout {
                endpoint,
                timeout_ms,
            },
            other => WalletError::Rpc(other),
        }
    }
}

impl From<BuildError> for WalletError {
    fn from(e: BuildError) -> Self {
        WalletError::Validation(e.to_string())
    }
}

pub type WalletResult<T> = Result<T, WalletError>;
