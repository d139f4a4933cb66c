//! Private keys at rest.
//!
//! # Data Flow
//! ```text
//! store(wallet_id, &mut key)
//!     → enclave.ensure_key(alias)        per-wallet key, created once, never exported
//!     → enclave.seal(alias, key, aad)    fresh 96-bit IV, AES-256-GCM, aad = wallet id
//!     → zero the caller's buffer
//!     → EncryptedKeyRecord {ciphertext, iv, alias} persisted
//!
//! decrypt(record)
//!     → enclave.open(...) → Zeroizing<Vec<u8>>, dropped by the signer
//! ```
//!
//! # Design Decisions
//! - Only ciphertext and IV live outside the enclave
//! - Decrypt failures are fatal for the wallet; nothing retries them
//! - The enclave is a trait so each platform can supply its own keystore

pub mod enclave;
pub mod key_vault;

use thiserror::Error;

pub use enclave::{SealedBlob, SecureEnclave, SoftwareEnclave};
pub use key_vault::{EncryptedKeyRecord, KeyVault};

/// Errors from the vault and its enclave.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("no key stored for wallet {0}")]
    NotFound(String),

    #[error("enclave key '{0}' is missing or revoked")]
    KeyUnavailable(String),

    /// Authentication failed: tampered ciphertext, wrong key or wrong wallet.
    #[error("key record could not be decrypted")]
    Decrypt,

    #[error("encryption failed: {0}")]
    Seal(String),

    #[error("vault storage error: {0}")]
    Io(#[from] std::io::Error),
}

pub type VaultResult<T> = Result<T, VaultError>;
