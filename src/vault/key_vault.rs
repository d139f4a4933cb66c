//! Encrypted key records.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use zeroize::{Zeroize, Zeroizing};

use crate::fsutil;
use crate::vault::enclave::SecureEnclave;
use crate::vault::{VaultError, VaultResult};

/// Ciphertext of one wallet's private key plus what is needed to open it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKeyRecord {
    pub wallet_id: String,
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub iv: Vec<u8>,
    pub key_alias: String,
}

impl std::fmt::Debug for EncryptedKeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedKeyRecord")
            .field("wallet_id", &self.wallet_id)
            .field("key_alias", &self.key_alias)
            .field("ciphertext", &"[REDACTED]")
            .finish()
    }
}

/// Per-wallet encrypted key storage on top of a `SecureEnclave`.
pub struct KeyVault {
    enclave: Arc<dyn SecureEnclave>,
    records: DashMap<String, EncryptedKeyRecord>,
    path: Option<PathBuf>,
    /// Serializes mutations so the file is written before memory changes.
    write_lock: Mutex<()>,
}

impl KeyVault {
    /// In-memory vault.
    pub fn new(enclave: Arc<dyn SecureEnclave>) -> Self {
        Self {
            enclave,
            records: DashMap::new(),
            path: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Vault whose records are persisted to `path`, loading existing ones.
    pub fn open(enclave: Arc<dyn SecureEnclave>, path: impl Into<PathBuf>) -> VaultResult<Self> {
        let path = path.into();
        let records = DashMap::new();
        let stored: Option<BTreeMap<String, EncryptedKeyRecord>> = fsutil::read_json(&path)?;
        for (wallet_id, record) in stored.unwrap_or_default() {
            records.insert(wallet_id, record);
        }
        tracing::info!(path = %path.display(), records = records.len(), "Key vault loaded");

        Ok(Self {
            enclave,
            records,
            path: Some(path),
            write_lock: Mutex::new(()),
        })
    }

    /// Encrypt and store `plaintext` for `wallet_id`.
    ///
    /// `plaintext` is zeroed before this returns, on success and on failure.
    pub fn store(&self, wallet_id: &str, plaintext: &mut [u8]) -> VaultResult<()> {
        let sealed = self.seal(wallet_id, plaintext);
        plaintext.zeroize();
        let sealed = sealed?;

        let _write = self.write_guard();
        let mut next = self.snapshot();
        next.insert(wallet_id.to_string(), sealed.clone());
        self.persist(&next)?;

        self.records.insert(wallet_id.to_string(), sealed);
        tracing::info!(wallet_id, "Key stored");
        Ok(())
    }

    fn seal(&self, wallet_id: &str, plaintext: &[u8]) -> VaultResult<EncryptedKeyRecord> {
        let alias = key_alias(wallet_id);
        self.enclave.ensure_key(&alias)?;
        let blob = self.enclave.seal(&alias, plaintext, wallet_id.as_bytes())?;
        Ok(EncryptedKeyRecord {
            wallet_id: wallet_id.to_string(),
            ciphertext: blob.ciphertext,
            iv: blob.iv.to_vec(),
            key_alias: alias,
        })
    }

    pub fn retrieve_encrypted(&self, wallet_id: &str) -> VaultResult<EncryptedKeyRecord> {
        self.records
            .get(wallet_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| VaultError::NotFound(wallet_id.to_string()))
    }

    /// Open a record. Any failure means the wallet must be re-imported.
    pub fn decrypt(&self, record: &EncryptedKeyRecord) -> VaultResult<Zeroizing<Vec<u8>>> {
        self.enclave
            .open(
                &record.key_alias,
                &record.ciphertext,
                &record.iv,
                record.wallet_id.as_bytes(),
            )
            .inspect_err(|e| {
                tracing::error!(wallet_id = %record.wallet_id, error = %e, "Key record failed to decrypt")
            })
    }

    /// Remove the record and its enclave key. Missing wallets are ignored.
    pub fn delete(&self, wallet_id: &str) -> VaultResult<()> {
        let _write = self.write_guard();
        if self.records.contains_key(wallet_id) {
            let mut next = self.snapshot();
            next.remove(wallet_id);
            self.persist(&next)?;
            self.records.remove(wallet_id);
            tracing::info!(wallet_id, "Key deleted");
        }
        self.enclave.delete_key(&key_alias(wallet_id))
    }

    pub fn contains(&self, wallet_id: &str) -> bool {
        self.records.contains_key(wallet_id)
    }

    fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn snapshot(&self) -> BTreeMap<String, EncryptedKeyRecord> {
        self.records
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    fn persist(&self, snapshot: &BTreeMap<String, EncryptedKeyRecord>) -> VaultResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        fsutil::write_json_atomic(path, snapshot)?;
        Ok(())
    }
}

fn key_alias(wallet_id: &str) -> String {
    format!("wallet-key/{}", wallet_id)
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
