//! Persistence collaborator.
//!
//! # Data Flow
//! ```text
//! Coordinator            → insert(PENDING record)     before submit returns
//! ConfirmationMonitor    → query_pending / update_status
//! WalletManager          → insert_wallet / activate_wallet / remove_wallet
//! MemoryStore            → optional JSON snapshot after every mutation
//! ```
//!
//! # Design Decisions
//! - Hash uniqueness and status monotonicity are enforced here, not by callers
//! - Activation is exclusive and atomic

pub mod memory;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;
pub use types::{now_millis, TransactionKind, TransactionRecord, TransactionStatus, Wallet};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a transaction with hash {0} is already recorded")]
    DuplicateHash(String),

    #[error("transaction {0} not found")]
    NotFound(String),

    #[error("transaction {id} is already {status} and cannot change")]
    TerminalState { id: String, status: TransactionStatus },

    #[error("wallet {0} not found")]
    WalletNotFound(String),

    #[error("wallet {0} already exists")]
    DuplicateWallet(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable storage for wallets and transaction records.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert a new record. Fails if its hash is already known.
    async fn insert(&self, record: TransactionRecord) -> StoreResult<()>;

    /// Move a PENDING record forward. Terminal records are never changed.
    async fn update_status(
        &self,
        id: &str,
        status: TransactionStatus,
        confirmations: u32,
        error: Option<String>,
    ) -> StoreResult<TransactionRecord>;

    async fn query_pending(&self) -> StoreResult<Vec<TransactionRecord>>;

    async fn get(&self, id: &str) -> StoreResult<Option<TransactionRecord>>;

    async fn find_by_hash(&self, hash: &str) -> StoreResult<Option<TransactionRecord>>;

    /// Newest first.
    async fn history(&self, wallet_id: &str, limit: usize) -> StoreResult<Vec<TransactionRecord>>;

    async fn get_active_wallet(&self) -> StoreResult<Option<Wallet>>;

    async fn get_wallet(&self, id: &str) -> StoreResult<Option<Wallet>>;

    async fn insert_wallet(&self, wallet: Wallet) -> StoreResult<()>;

    /// Make `id` the only active wallet.
    async fn activate_wallet(&self, id: &str) -> StoreResult<Wallet>;

    async fn remove_wallet(&self, id: &str) -> StoreResult<()>;

    async fn list_wallets(&self) -> StoreResult<Vec<Wallet>>;
}
