//! Per-wallet signing locks.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per wallet id, created on first use.
#[derive(Debug, Default)]
pub struct SigningLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SigningLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive signing rights on `wallet_id`.
    pub async fn acquire(&self, wallet_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(wallet_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}
