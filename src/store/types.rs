//! Wallet and transaction records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::keys::DerivationScheme;
use crate::transaction::Pubkey;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: String,
    pub public_key: Pubkey,
    pub label: String,
    pub is_active: bool,
    #[serde(default)]
    pub derivation: DerivationScheme,
    pub created_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Send,
    Swap,
    Stake,
    Unstake,
    Approve,
    Revoke,
}

/// PENDING is the only state with outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        matches!((self, next), (TransactionStatus::Pending, _))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Confirmed => "CONFIRMED",
            TransactionStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A broadcast transaction and what is known about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub wallet_id: String,
    /// Network hash returned by the broadcast. Unique across records.
    pub hash: String,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub fee: u64,
    pub confirmations: u32,
    pub error: Option<String>,
    pub memo: Option<String>,
    pub timestamp: u64,
    pub simulated: bool,
    #[serde(default)]
    pub simulation_logs: Vec<String>,
}
