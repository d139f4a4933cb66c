//! In-memory store with optional JSON snapshot persistence.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use tokio::sync::{Mutex, RwLock};

use crate::fsutil;
use crate::store::{
    StoreError, StoreResult, TransactionRecord, TransactionStatus, TransactionStore, Wallet,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    wallets: Vec<Wallet>,
    records: Vec<TransactionRecord>,
}

/// Thread-safe store. When a path is set every mutation writes the resulting
/// snapshot first and only then changes memory, so a failed write leaves the
/// store exactly as it was and a PENDING record survives a crash.
pub struct MemoryStore {
    records: DashMap<String, TransactionRecord>,
    /// hash → record id
    by_hash: DashMap<String, String>,
    wallets: RwLock<Vec<Wallet>>,
    path: Option<PathBuf>,
    /// Held for the whole of every mutation. Taken before `wallets`.
    write_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            by_hash: DashMap::new(),
            wallets: RwLock::new(Vec::new()),
            path: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Load from `path` if it exists and persist there from now on.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let snapshot: Snapshot = fsutil::read_json(&path)?.unwrap_or_default();

        let mut store = Self {
            path: Some(path.clone()),
            ..Self::new()
        };
        for record in snapshot.records {
            store.by_hash.insert(record.hash.clone(), record.id.clone());
            store.records.insert(record.id.clone(), record);
        }
        let pending = store.records.iter().filter(|r| !r.status.is_terminal()).count();
        tracing::info!(
            path = %path.display(),
            wallets = snapshot.wallets.len(),
            records = store.records.len(),
            pending,
            "Loaded transaction store"
        );
        *store.wallets.get_mut() = snapshot.wallets;
        Ok(store)
    }

    /// Write the state the store will have once `wallets` (if given) replaces
    /// the wallet list and `changed` (if given) replaces or adds its record.
    /// Callers hold `write_lock` and apply the change to memory afterwards.
    async fn persist(
        &self,
        wallets: Option<&[Wallet]>,
        changed: Option<&TransactionRecord>,
    ) -> StoreResult<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };

        let mut records: Vec<TransactionRecord> = self
            .records
            .iter()
            .filter(|r| changed.map_or(true, |c| c.id != *r.key()))
            .map(|r| r.value().clone())
            .collect();
        records.extend(changed.cloned());
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        let wallets = match wallets {
            Some(wallets) => wallets.to_vec(),
            None => self.wallets.read().await.clone(),
        };
        let snapshot = Snapshot { wallets, records };

        tokio::task::spawn_blocking(move || fsutil::write_json_atomic(&path, &snapshot))
            .await
            .map_err(io::Error::other)??;
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn insert(&self, record: TransactionRecord) -> StoreResult<()> {
        let _write = self.write_lock.lock().await;
        if self.by_hash.contains_key(&record.hash) {
            return Err(StoreError::DuplicateHash(record.hash));
        }
        self.persist(None, Some(&record)).await?;

        tracing::debug!(id = %record.id, hash = %record.hash, status = %record.status, "Record inserted");
        self.by_hash.insert(record.hash.clone(), record.id.clone());
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn update_status(
        &self,
        id: &str,
        status: TransactionStatus,
        confirmations: u32,
        error: Option<String>,
    ) -> StoreResult<TransactionRecord> {
        let _write = self.write_lock.lock().await;
        let mut updated = self
            .records
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if !updated.status.can_transition_to(status) {
            return Err(StoreError::TerminalState {
                id: id.to_string(),
                status: updated.status,
            });
        }
        updated.status = status;
        updated.confirmations = confirmations;
        if error.is_some() {
            updated.error = error;
        }

        self.persist(None, Some(&updated)).await?;
        self.records.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    async fn query_pending(&self) -> StoreResult<Vec<TransactionRecord>> {
        let mut pending: Vec<TransactionRecord> = self
            .records
            .iter()
            .filter(|r| r.status == TransactionStatus::Pending)
            .map(|r| r.value().clone())
            .collect();
        pending.sort_by_key(|r| r.timestamp);
        Ok(pending)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<TransactionRecord>> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }

    async fn find_by_hash(&self, hash: &str) -> StoreResult<Option<TransactionRecord>> {
        let Some(id) = self.by_hash.get(hash).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        self.get(&id).await
    }

    async fn history(&self, wallet_id: &str, limit: usize) -> StoreResult<Vec<TransactionRecord>> {
        let mut records: Vec<TransactionRecord> = self
            .records
            .iter()
            .filter(|r| r.wallet_id == wallet_id)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }

    async fn get_active_wallet(&self) -> StoreResult<Option<Wallet>> {
        Ok(self.wallets.read().await.iter().find(|w| w.is_active).cloned())
    }

    async fn get_wallet(&self, id: &str) -> StoreResult<Option<Wallet>> {
        Ok(self.wallets.read().await.iter().find(|w| w.id == id).cloned())
    }

    async fn insert_wallet(&self, mut wallet: Wallet) -> StoreResult<()> {
        let _write = self.write_lock.lock().await;
        let mut wallets = self.wallets.write().await;
        if wallets.iter().any(|w| w.id == wallet.id) {
            return Err(StoreError::DuplicateWallet(wallet.id));
        }
        // Only activate_wallet may set the flag.
        wallet.is_active = false;

        let mut next = wallets.clone();
        next.push(wallet);
        self.persist(Some(&next), None).await?;
        *wallets = next;
        Ok(())
    }

    async fn activate_wallet(&self, id: &str) -> StoreResult<Wallet> {
        let _write = self.write_lock.lock().await;
        let mut wallets = self.wallets.write().await;
        if !wallets.iter().any(|w| w.id == id) {
            return Err(StoreError::WalletNotFound(id.to_string()));
        }

        let mut next = wallets.clone();
        let mut activated = None;
        for wallet in next.iter_mut() {
            wallet.is_active = wallet.id == id;
            if wallet.is_active {
                activated = Some(wallet.clone());
            }
        }
        let activated = activated.ok_or_else(|| StoreError::WalletNotFound(id.to_string()))?;
        self.persist(Some(&next), None).await?;
        *wallets = next;
        Ok(activated)
    }

    async fn remove_wallet(&self, id: &str) -> StoreResult<()> {
        let _write = self.write_lock.lock().await;
        let mut wallets = self.wallets.write().await;
        let next: Vec<Wallet> = wallets.iter().filter(|w| w.id != id).cloned().collect();
        if next.len() == wallets.len() {
            return Err(StoreError::WalletNotFound(id.to_string()));
        }
        self.persist(Some(&next), None).await?;
        *wallets = next;
        Ok(())
    }

    async fn list_wallets(&self) -> StoreResult<Vec<Wallet>> {
        let mut wallets = self.wallets.read().await.clone();
        wallets.sort_by_key(|w| w.created_at);
        Ok(wallets)
    }
}
