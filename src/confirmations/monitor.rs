//! Background poller that advances PENDING records.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::{ConfirmationConfig, MAX_STATUS_BATCH};
use crate::error::WalletError;
use crate::events::TransactionFeed;
use crate::health::EndpointHealthMonitor;
use crate::observability::metrics;
use crate::rpc::types::describe_chain_error;
use crate::rpc::{ChainRpc, Commitment, SignatureStatus};
use crate::store::{
    now_millis, StoreError, TransactionRecord, TransactionStatus, TransactionStore,
};

/// Counts from one polling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub checked: usize,
    pub confirmed: usize,
    pub failed: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Marked FAILED because the network never saw them before expiry.
    pub expired: usize,
}

pub struct ConfirmationMonitor {
    rpc: Arc<dyn ChainRpc>,
    store: Arc<dyn TransactionStore>,
    health: Arc<EndpointHealthMonitor>,
    feed: TransactionFeed,
    config: ConfirmationConfig,
}

impl ConfirmationMonitor {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        store: Arc<dyn TransactionStore>,
        health: Arc<EndpointHealthMonitor>,
        feed: TransactionFeed,
        config: ConfirmationConfig,
    ) -> Self {
        Self {
            rpc,
            store,
            health,
            feed,
            config,
        }
    }

    /// Poll every PENDING record once.
    pub async fn poll_once(&self) -> PollSummary {
        let mut summary = PollSummary::default();
        let pending = match self.store.query_pending().await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load pending transactions");
                return summary;
            }
        };
        if pending.is_empty() {
            return summary;
        }

        let batch_size = self.config.batch_size.clamp(1, MAX_STATUS_BATCH);
        for batch in pending.chunks(batch_size) {
            let hashes: Vec<String> = batch.iter().map(|r| r.hash.clone()).collect();
            let statuses = match self.rpc.get_signature_statuses(&hashes).await {
                Ok(statuses) => statuses,
                Err(e) => {
                    let retryable = e.is_retryable();
                    let error = WalletError::ConfirmationPoll(e.to_string());
                    tracing::warn!(batch = batch.len(), error = %error, "Deferring to next interval");
                    summary.skipped += batch.len();
                    if retryable {
                        self.health.reevaluate().await;
                    }
                    continue;
                }
            };

            for (record, status) in batch.iter().zip(statuses) {
                summary.checked += 1;
                let unseen = status.is_none();
                let outcome = match status {
                    Some(status) => self.apply(record, &status).await,
                    None => self.expire_if_unseen(record).await,
                };
                match outcome {
                    Ok(Some(updated)) => {
                        match updated.status {
                            TransactionStatus::Confirmed => summary.confirmed += 1,
                            TransactionStatus::Failed if unseen => summary.expired += 1,
                            TransactionStatus::Failed => summary.failed += 1,
                            TransactionStatus::Pending => summary.updated += 1,
                        }
                        self.feed.publish(updated);
                    }
                    Ok(None) => {}
                    Err(StoreError::TerminalState { id, status }) => {
                        tracing::debug!(id = %id, status = %status, "Record already final");
                    }
                    Err(e) => {
                        tracing::error!(id = %record.id, error = %e, "Failed to update record");
                        summary.skipped += 1;
                    }
                }
            }
        }

        if summary.confirmed + summary.failed + summary.expired > 0 {
            tracing::info!(
                checked = summary.checked,
                confirmed = summary.confirmed,
                failed = summary.failed,
                expired = summary.expired,
                "Confirmation poll advanced records"
            );
        }
        summary
    }

    async fn apply(
        &self,
        record: &TransactionRecord,
        status: &SignatureStatus,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        if let Some(err) = &status.err {
            let message = describe_chain_error(err);
            tracing::warn!(id = %record.id, hash = %record.hash, error = %message, "Transaction failed on chain");
            let updated = self
                .store
                .update_status(
                    &record.id,
                    TransactionStatus::Failed,
                    record.confirmations,
                    Some(message),
                )
                .await?;
            metrics::record_finalized("failed");
            return Ok(Some(updated));
        }

        let required = self.config.required_confirmations;
        let finalized = status.confirmation_status == Some(Commitment::Finalized)
            || status.confirmations.is_none();
        let depth = status
            .confirmations
            .map(|c| c.min(u32::MAX as u64) as u32)
            .unwrap_or(required.max(record.confirmations));

        if finalized || depth >= required {
            tracing::info!(id = %record.id, hash = %record.hash, confirmations = depth, "Transaction confirmed");
            let updated = self
                .store
                .update_status(&record.id, TransactionStatus::Confirmed, depth, None)
                .await?;
            metrics::record_finalized("confirmed");
            return Ok(Some(updated));
        }

        if depth == record.confirmations {
            return Ok(None);
        }
        let updated = self
            .store
            .update_status(&record.id, TransactionStatus::Pending, depth, None)
            .await?;
        Ok(Some(updated))
    }

    /// A record the network has no status for is left alone until it is older
    /// than the expiry window. Past that, its checkpoint can no longer be valid,
    /// so unless `getTransaction` finds it the record is marked FAILED.
    async fn expire_if_unseen(
        &self,
        record: &TransactionRecord,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        let age_ms = now_millis().saturating_sub(record.timestamp);
        if age_ms < self.config.pending_expiry_secs.saturating_mul(1000) {
            return Ok(None);
        }

        match self.rpc.get_transaction(&record.hash).await {
            Ok(None) => {}
            Ok(Some(_)) => {
                tracing::debug!(id = %record.id, hash = %record.hash, "Expired record found on chain, waiting for status");
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(id = %record.id, error = %e, "Could not check expired record");
                return Ok(None);
            }
        }

        tracing::warn!(
            id = %record.id,
            hash = %record.hash,
            age_secs = age_ms / 1000,
            "Transaction expired without landing"
        );
        let updated = self
            .store
            .update_status(
                &record.id,
                TransactionStatus::Failed,
                record.confirmations,
                Some("expired: the network never included the transaction".to_string()),
            )
            .await?;
        metrics::record_finalized("expired");
        Ok(Some(updated))
    }

    /// Poll on a fixed interval until shutdown.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Confirmation monitor disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.config.interval_secs,
            required = self.config.required_confirmations,
            "Confirmation monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs.max(1)));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Confirmation monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EndpointsConfig, HealthCheckConfig};
    use crate::health::{ConnectivityFlag, EndpointSelector};
    use crate::rpc::mock::MockRpc;
    use crate::rpc::RpcError;
    use crate::store::{now_millis, MemoryStore, TransactionKind};
    use serde_json::json;

    struct Harness {
        monitor: ConfirmationMonitor,
        rpc: Arc<MockRpc>,
        store: Arc<MemoryStore>,
        feed: TransactionFeed,
    }

    fn harness() -> Harness {
        let rpc = Arc::new(MockRpc::new());
        let store = Arc::new(MemoryStore::new());
        let feed = TransactionFeed::default();
        let selector = Arc::new(EndpointSelector::new(&EndpointsConfig::default()));
        let health = Arc::new(EndpointHealthMonitor::new(
            selector,
            rpc.clone(),
            Arc::new(ConnectivityFlag::default()),
            HealthCheckConfig::default(),
        ));
        let monitor = ConfirmationMonitor::new(
            rpc.clone(),
            store.clone(),
            health,
            feed.clone(),
            ConfirmationConfig::default(),
        );
        Harness {
            monitor,
            rpc,
            store,
            feed,
        }
    }

    fn pending(id: &str, hash: &str) -> TransactionRecord {
        TransactionRecord {
            id: id.into(),
            wallet_id: "w1".into(),
            hash: hash.into(),
            kind: TransactionKind::Send,
            status: TransactionStatus::Pending,
            from: "from".into(),
            to: "to".into(),
            amount: 1_000,
            fee: 5_000,
            confirmations: 3,
            error: None,
            memo: None,
            timestamp: now_millis(),
            simulated: true,
            simulation_logs: Vec::new(),
        }
    }

    fn status(confirmations: Option<u64>, commitment: Commitment, err: Option<serde_json::Value>) -> SignatureStatus {
        SignatureStatus {
            slot: 100,
            confirmations,
            err,
            confirmation_status: Some(commitment),
        }
    }

    #[tokio::test]
    async fn test_chain_error_marks_failed_and_keeps_count() {
        let h = harness();
        h.store.insert(pending("a", "hash-a")).await.unwrap();
        h.rpc.statuses.lock().unwrap().insert(
            "hash-a".into(),
            status(Some(5), Commitment::Confirmed, Some(json!("InsufficientFundsForFee"))),
        );

        let summary = h.monitor.poll_once().await;

        assert_eq!(summary.failed, 1);
        let record = h.store.get("a").await.unwrap().unwrap();
        assert_eq!(record.status, TransactionStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("InsufficientFundsForFee"));
        assert_eq!(record.confirmations, 3);
    }

    #[tokio::test]
    async fn test_finalized_marks_confirmed() {
        let h = harness();
        let mut feed = h.feed.subscribe();
        h.store.insert(pending("a", "hash-a")).await.unwrap();
        h.rpc
            .statuses
            .lock()
            .unwrap()
            .insert("hash-a".into(), status(None, Commitment::Finalized, None));

        let summary = h.monitor.poll_once().await;

        assert_eq!(summary.confirmed, 1);
        let record = h.store.get("a").await.unwrap().unwrap();
        assert_eq!(record.status, TransactionStatus::Confirmed);
        assert_eq!(feed.next().await.unwrap().status, TransactionStatus::Confirmed);
        assert!(h.store.query_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sufficient_depth_confirms() {
        let h = harness();
        h.store.insert(pending("a", "hash-a")).await.unwrap();
        h.rpc
            .statuses
            .lock()
            .unwrap()
            .insert("hash-a".into(), status(Some(32), Commitment::Confirmed, None));

        h.monitor.poll_once().await;
        let record = h.store.get("a").await.unwrap().unwrap();
        assert_eq!(record.status, TransactionStatus::Confirmed);
        assert_eq!(record.confirmations, 32);
    }

    #[tokio::test]
    async fn test_shallow_depth_updates_count_only() {
        let h = harness();
        h.store.insert(pending("a", "hash-a")).await.unwrap();
        h.rpc
            .statuses
            .lock()
            .unwrap()
            .insert("hash-a".into(), status(Some(12), Commitment::Confirmed, None));

        let first = h.monitor.poll_once().await;
        assert_eq!(first.updated, 1);
        let record = h.store.get("a").await.unwrap().unwrap();
        assert_eq!(record.status, TransactionStatus::Pending);
        assert_eq!(record.confirmations, 12);

        // Same depth again is not a change.
        let second = h.monitor.poll_once().await;
        assert_eq!(second.updated, 0);
    }

    #[tokio::test]
    async fn test_unknown_hash_stays_pending() {
        let h = harness();
        h.store.insert(pending("a", "hash-a")).await.unwrap();

        let summary = h.monitor.poll_once().await;
        assert_eq!(summary.checked, 1);
        assert_eq!(h.store.get("a").await.unwrap().unwrap().status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn test_repeated_observation_never_creates_records() {
        let h = harness();
        h.store.insert(pending("a", "hash-a")).await.unwrap();
        h.rpc
            .statuses
            .lock()
            .unwrap()
            .insert("hash-a".into(), status(None, Commitment::Finalized, None));

        h.monitor.poll_once().await;
        h.monitor.poll_once().await;

        assert_eq!(h.store.history("w1", 10).await.unwrap().len(), 1);
        assert_eq!(h.rpc.count("getSignatureStatuses"), 1);
    }

    #[tokio::test]
    async fn test_rpc_error_is_skipped_and_retried_next_tick() {
        let h = harness();
        h.store.insert(pending("a", "hash-a")).await.unwrap();
        *h.rpc.status_error.lock().unwrap() = Some(RpcError::Transport("reset".into()));

        let summary = h.monitor.poll_once().await;
        assert_eq!(summary.skipped, 1);
        assert_eq!(h.store.get("a").await.unwrap().unwrap().status, TransactionStatus::Pending);
        assert_eq!(h.rpc.count("getHealth"), 1);

        *h.rpc.status_error.lock().unwrap() = None;
        h.rpc
            .statuses
            .lock()
            .unwrap()
            .insert("hash-a".into(), status(None, Commitment::Finalized, None));
        let summary = h.monitor.poll_once().await;
        assert_eq!(summary.confirmed, 1);
    }

    #[tokio::test]
    async fn test_mixed_batch_advances_each_record_independently() {
        let h = harness();
        h.store.insert(pending("a", "hash-a")).await.unwrap();
        h.store.insert(pending("b", "hash-b")).await.unwrap();
        h.store.insert(pending("c", "hash-c")).await.unwrap();
        {
            let mut statuses = h.rpc.statuses.lock().unwrap();
            statuses.insert("hash-a".into(), status(None, Commitment::Finalized, None));
            statuses.insert(
                "hash-b".into(),
                status(Some(1), Commitment::Processed, Some(json!({"InstructionError": [0, "Custom"]}))),
            );
        }

        let summary = h.monitor.poll_once().await;
        assert_eq!((summary.confirmed, summary.failed, summary.checked), (1, 1, 3));
        assert_eq!(h.store.query_pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_run_exits_on_shutdown() {
        let h = harness();
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(Arc::new(h.monitor).run(rx));
        tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_unseen_record_expires_after_window() {
        let h = harness();
        let mut fresh = pending("a", "hash-a");
        fresh.timestamp = now_millis();
        let mut stale = pending("b", "hash-b");
        stale.timestamp = now_millis() - 10 * 60 * 1000;
        h.store.insert(fresh).await.unwrap();
        h.store.insert(stale).await.unwrap();

        let summary = h.monitor.poll_once().await;

        assert_eq!((summary.checked, summary.expired, summary.failed), (2, 1, 0));
        let expired = h.store.get("b").await.unwrap().unwrap();
        assert_eq!(expired.status, TransactionStatus::Failed);
        assert!(expired.error.unwrap().starts_with("expired"));
        assert_eq!(h.store.get("a").await.unwrap().unwrap().status, TransactionStatus::Pending);
        assert_eq!(h.rpc.count("getTransaction"), 1);
    }

    #[tokio::test]
    async fn test_stale_record_known_to_chain_is_kept() {
        let h = harness();
        let mut stale = pending("a", "hash-a");
        stale.timestamp = now_millis() - 10 * 60 * 1000;
        h.store.insert(stale).await.unwrap();
        h.rpc
            .transactions
            .lock()
            .unwrap()
            .insert("hash-a".into(), json!({ "slot": 90, "meta": { "err": null } }));

        let summary = h.monitor.poll_once().await;
        assert_eq!(summary.expired, 0);
        assert_eq!(h.store.get("a").await.unwrap().unwrap().status, TransactionStatus::Pending);

        h.rpc.fail_next("getTransaction", RpcError::Http(503));
        h.rpc.transactions.lock().unwrap().clear();
        assert_eq!(h.monitor.poll_once().await.expired, 0);
        assert_eq!(h.monitor.poll_once().await.expired, 1);
    }
}
