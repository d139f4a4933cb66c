//! Submission pipeline.

use std::fmt;
use std::future::Future;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::{RetryConfig, TransferConfig};
use crate::coordinator::locks::SigningLocks;
use crate::error::{WalletError, WalletResult};
use crate::events::{Subscription, TransactionFeed};
use crate::health::{EndpointHealth, EndpointHealthMonitor};
use crate::keys;
use crate::observability::metrics;
use crate::resilience::retry_with_backoff;
use crate::risk::{ConfirmationGate, RiskScanner};
use crate::rpc::{ChainRpc, RpcResult, SignatureInfo, TokenAccount};
use crate::store::{
    now_millis, TransactionKind, TransactionRecord, TransactionStatus, TransactionStore, Wallet,
};
use crate::transaction::{
    PriorityFee, Signature, SignedTransaction, SimulationOutcome, TransactionBuilder,
    TransactionSimulator, TransferIntent, UnsignedTransaction,
};
use crate::vault::KeyVault;

/// A transfer requested by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub recipient: String,
    /// Smallest units.
    pub amount: u64,
    pub memo: Option<String>,
    /// Compute-unit price override in micro-units; `None` uses the configured default.
    pub priority_fee: Option<u64>,
}

/// Where a submission is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStage {
    Validating,
    Simulating,
    RiskScanning,
    Signing,
    Broadcasting,
    Persisted,
}

impl fmt::Display for SubmitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubmitStage::Validating => "validating",
            SubmitStage::Simulating => "simulating",
            SubmitStage::RiskScanning => "risk_scanning",
            SubmitStage::Signing => "signing",
            SubmitStage::Broadcasting => "broadcasting",
            SubmitStage::Persisted => "persisted",
        })
    }
}

/// Everything the coordinator talks to. Built by the composition root.
pub struct Collaborators {
    pub rpc: Arc<dyn ChainRpc>,
    pub health: Arc<EndpointHealthMonitor>,
    pub vault: Arc<KeyVault>,
    pub store: Arc<dyn TransactionStore>,
    pub scanner: Arc<dyn RiskScanner>,
    pub gate: Arc<dyn ConfirmationGate>,
    pub feed: TransactionFeed,
}

struct Prepared {
    wallet: Wallet,
    unsigned: UnsignedTransaction,
    fee: u64,
}

/// Orchestrates validate → simulate → risk-scan → sign → broadcast → persist.
pub struct TransactionCoordinator {
    rpc: Arc<dyn ChainRpc>,
    health: Arc<EndpointHealthMonitor>,
    vault: Arc<KeyVault>,
    store: Arc<dyn TransactionStore>,
    scanner: Arc<dyn RiskScanner>,
    gate: Arc<dyn ConfirmationGate>,
    feed: TransactionFeed,
    builder: TransactionBuilder,
    simulator: TransactionSimulator,
    locks: SigningLocks,
    transfer: TransferConfig,
    retries: RetryConfig,
}

impl TransactionCoordinator {
    pub fn new(parts: Collaborators, transfer: TransferConfig, retries: RetryConfig) -> Self {
        Self {
            simulator: TransactionSimulator::new(Arc::clone(&parts.rpc)),
            rpc: parts.rpc,
            health: parts.health,
            vault: parts.vault,
            store: parts.store,
            scanner: parts.scanner,
            gate: parts.gate,
            feed: parts.feed,
            builder: TransactionBuilder::new(),
            locks: SigningLocks::new(),
            transfer,
            retries,
        }
    }

    /// Run the full lifecycle. On success the returned record is PENDING and
    /// already durably stored.
    pub async fn submit(
        &self,
        request: &SubmitRequest,
        cancel: &CancellationToken,
    ) -> WalletResult<TransactionRecord> {
        let result = self.run_submit(request, cancel).await;
        match &result {
            Ok(record) => {
                metrics::record_submission("pending");
                tracing::info!(id = %record.id, hash = %record.hash, amount = record.amount, "Transaction submitted");
            }
            Err(e) => {
                metrics::record_submission(e.kind());
                tracing::warn!(kind = e.kind(), error = %e, "Submission failed");
            }
        }
        result
    }

    /// Dry-run a transfer from the active wallet without signing it.
    pub async fn simulate(
        &self,
        request: &SubmitRequest,
        cancel: &CancellationToken,
    ) -> WalletResult<SimulationOutcome> {
        let prepared = self.build(request).await?;
        self.read(cancel, "simulateTransaction", || self.simulator.simulate(&prepared.unsigned))
            .await
    }

    pub fn current_endpoint_health(&self) -> EndpointHealth {
        self.health.health()
    }

    /// Inserted and updated records from now on.
    pub fn observe_pending(&self) -> Subscription {
        self.feed.subscribe()
    }

    /// Native balance of the active wallet.
    pub async fn balance(&self) -> WalletResult<u64> {
        let wallet = self.active_wallet().await?;
        let owner = wallet.public_key;
        self.read(&CancellationToken::new(), "getBalance", || self.rpc.get_balance(&owner))
            .await
    }

    /// Token accounts held by the active wallet.
    pub async fn token_accounts(&self) -> WalletResult<Vec<TokenAccount>> {
        let wallet = self.active_wallet().await?;
        let owner = wallet.public_key;
        self.read(&CancellationToken::new(), "getTokenAccountsByOwner", || {
            self.rpc.get_token_accounts_by_owner(&owner)
        })
        .await
    }

    /// The network's view of the active wallet's recent signatures, newest
    /// first, including transfers this device never recorded.
    pub async fn chain_activity(&self, limit: usize) -> WalletResult<Vec<SignatureInfo>> {
        let wallet = self.active_wallet().await?;
        let owner = wallet.public_key;
        self.read(&CancellationToken::new(), "getSignaturesForAddress", || {
            self.rpc.get_signatures_for_address(&owner, limit)
        })
        .await
    }

    /// Full transaction as reported by the network, `None` if it never landed.
    pub async fn lookup_transaction(&self, hash: &str) -> WalletResult<Option<Value>> {
        self.read(&CancellationToken::new(), "getTransaction", || {
            self.rpc.get_transaction(hash)
        })
        .await
    }

    /// Most recent records of the active wallet, newest first.
    pub async fn history(&self, limit: usize) -> WalletResult<Vec<TransactionRecord>> {
        let wallet = self.active_wallet().await?;
        Ok(self.store.history(&wallet.id, limit).await?)
    }

    /// Fee charged for a plain transfer with the given priority override.
    pub fn estimate_fee(&self, priority_fee: Option<u64>) -> u64 {
        self.fee_for(1, self.priority_fee(priority_fee))
    }

    async fn run_submit(
        &self,
        request: &SubmitRequest,
        cancel: &CancellationToken,
    ) -> WalletResult<TransactionRecord> {
        trace_stage(SubmitStage::Validating);
        let prepared = self.build(request).await?;
        let owner = prepared.wallet.public_key;
        let available = self
            .read(cancel, "getBalance", || self.rpc.get_balance(&owner))
            .await?;
        let required = request
            .amount
            .checked_add(prepared.fee)
            .ok_or_else(|| WalletError::Validation("amount too large".to_string()))?;
        if required > available {
            return Err(WalletError::InsufficientBalance {
                required,
                available,
            });
        }

        trace_stage(SubmitStage::Simulating);
        let simulation = self
            .read(cancel, "simulateTransaction", || self.simulator.simulate(&prepared.unsigned))
            .await?;
        let simulation_logs = match simulation {
                SimulationOutcome::Ok { logs, .. } => logs,
                SimulationOutcome::Failed { error, logs } => {
                    return Err(WalletError::SimulationFailure {
                        message: error,
                        logs,
                    })
                }
            };

        trace_stage(SubmitStage::RiskScanning);
        self.screen(&prepared.unsigned, cancel).await?;

        trace_stage(SubmitStage::Signing);
        let checkpoint = self
            .read(cancel, "getLatestBlockhash", || self.rpc.get_latest_checkpoint())
            .await?;
        let unsigned = prepared.unsigned.with_checkpoint(checkpoint);
        let signed = self.sign(&prepared.wallet, &unsigned, cancel).await?;

        if cancel.is_cancelled() {
            return Err(WalletError::Cancelled);
        }

        trace_stage(SubmitStage::Broadcasting);
        let hash = self.broadcast(&signed).await?;

        let record = TransactionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            wallet_id: prepared.wallet.id.clone(),
            hash,
            kind: TransactionKind::Send,
            status: TransactionStatus::Pending,
            from: prepared.wallet.public_key.to_string(),
            to: request.recipient.trim().to_string(),
            amount: request.amount,
            fee: prepared.fee,
            confirmations: 0,
            error: None,
            memo: request.memo.clone().filter(|m| !m.is_empty()),
            timestamp: now_millis(),
            simulated: true,
            simulation_logs,
        };
        if let Err(source) = self.store.insert(record.clone()).await {
            tracing::error!(
                id = %record.id,
                hash = %record.hash,
                amount = record.amount,
                to = %record.to,
                error = %source,
                "Broadcast transaction could not be recorded"
            );
            return Err(WalletError::Unrecorded {
                hash: record.hash,
                source,
            });
        }
        self.feed.publish(record.clone());
        trace_stage(SubmitStage::Persisted);
        Ok(record)
    }

    async fn active_wallet(&self) -> WalletResult<Wallet> {
        self.store
            .get_active_wallet()
            .await?
            .ok_or(WalletError::NoActiveWallet)
    }

    async fn build(&self, request: &SubmitRequest) -> WalletResult<Prepared> {
        if request.amount < self.transfer.min_amount {
            return Err(WalletError::Validation("amount too small".to_string()));
        }
        let wallet = self.active_wallet().await?;

        let priority = self.priority_fee(request.priority_fee);
        let unsigned = self.builder.build_transfer(&TransferIntent {
            from: wallet.public_key,
            to: &request.recipient,
            amount: request.amount,
            memo: request.memo.as_deref(),
            priority_fee: priority,
        })?;
        let signatures = unsigned.message().header.num_required_signatures as u64;
        let fee = self.fee_for(signatures, priority);

        Ok(Prepared {
            wallet,
            unsigned,
            fee,
        })
    }

    fn priority_fee(&self, price_override: Option<u64>) -> Option<PriorityFee> {
        let micro_price = price_override.unwrap_or(self.transfer.default_priority_fee);
        (micro_price > 0).then_some(PriorityFee {
            compute_unit_limit: self.transfer.compute_unit_limit,
            micro_price,
        })
    }

    fn fee_for(&self, signatures: u64, priority: Option<PriorityFee>) -> u64 {
        self.transfer
            .base_fee_per_signature
            .saturating_mul(signatures)
            .saturating_add(priority.map(|p| p.total()).unwrap_or(0))
    }

    async fn screen(&self, unsigned: &UnsignedTransaction, cancel: &CancellationToken) -> WalletResult<()> {
        let assessment = self.scanner.analyze(&unsigned.message_bytes());
        if assessment.is_clean() {
            return Ok(());
        }

        tracing::warn!(
            level = %assessment.level,
            warnings = ?assessment.warnings,
            "Risk scan flagged transaction"
        );
        if cancellable(cancel, self.gate.confirm(&assessment)).await? {
            Ok(())
        } else {
            Err(WalletError::RiskBlocked(assessment))
        }
    }

    async fn sign(
        &self,
        wallet: &Wallet,
        unsigned: &UnsignedTransaction,
        cancel: &CancellationToken,
    ) -> WalletResult<SignedTransaction> {
        let _guard = cancellable(cancel, self.locks.acquire(&wallet.id)).await?;
        if cancel.is_cancelled() {
            return Err(WalletError::Cancelled);
        }
        let signature = self.sign_locked(wallet, unsigned)?;
        Ok(SignedTransaction::new(unsigned, signature))
    }

    /// Decrypt, sign, zero. Must stay free of await points.
    fn sign_locked(&self, wallet: &Wallet, unsigned: &UnsignedTransaction) -> WalletResult<Signature> {
        let record = self
            .vault
            .retrieve_encrypted(&wallet.id)
            .map_err(|e| WalletError::Signing(e.to_string()))?;
        let secret = self
            .vault
            .decrypt(&record)
            .map_err(|e| WalletError::Signing(e.to_string()))?;

        let signed = keys::sign(&unsigned.message_bytes(), &secret);
        drop(secret);
        let (signer, signature) = signed.map_err(|e| WalletError::Signing(e.to_string()))?;

        if signer != wallet.public_key || signer != unsigned.envelope().fee_payer {
            return Err(WalletError::Signing(format!(
                "stored key belongs to {}, not {}",
                signer, wallet.public_key
            )));
        }
        Ok(signature)
    }

    async fn broadcast(&self, signed: &SignedTransaction) -> WalletResult<String> {
        let wire = signed.to_wire_base64();
        let result = self
            .with_failover("sendTransaction", || self.rpc.send_transaction(&wire))
            .await;

        match result {
            Ok(hash) => {
                if hash != signed.hash() {
                    tracing::warn!(receipt = %hash, local = %signed.hash(), "Broadcast receipt differs from signature");
                }
                Ok(hash)
            }
            Err(e) if e.is_retryable() => Err(WalletError::Broadcast(format!(
                "no endpoint accepted the transaction after {} attempts: {}",
                self.retries.max_attempts.max(1),
                e
            ))),
            Err(e) => Err(WalletError::Broadcast(e.to_string())),
        }
    }

    /// Cancellable read that fails over like a broadcast does.
    async fn read<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        method: &'static str,
        call: F,
    ) -> WalletResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = RpcResult<T>>,
    {
        Ok(cancellable(cancel, self.with_failover(method, call)).await??)
    }

    /// Call the active endpoint, reporting transient failures to the health
    /// monitor so the next attempt goes to the endpoint it rotated to.
    async fn with_failover<T, F, Fut>(&self, method: &'static str, call: F) -> RpcResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = RpcResult<T>>,
    {
        retry_with_backoff(
            &self.retries,
            move |attempt| {
                let endpoint = self.health.current_endpoint();
                tracing::debug!(attempt, method, role = %endpoint.role, url = %endpoint.url, "Calling endpoint");
                let pending = call();
                async move {
                    pending.await.inspect_err(|e| {
                        self.health.report_failure(endpoint.role, e);
                    })
                }
            },
            |attempt, e| {
                tracing::warn!(attempt, method, error = %e, "Endpoint temporarily unavailable, retrying");
            },
        )
        .await
    }
}

fn trace_stage(stage: SubmitStage) {
    tracing::debug!(stage = %stage, "Submission stage");
}

/// Race `fut` against cancellation. Cancellation wins ties.
async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> WalletResult<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WalletError::Cancelled),
        out = fut => Ok(out),
    }
}
