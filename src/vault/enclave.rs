//! Secure-enclave capability and the software fallback.
//!
//! `SoftwareEnclave` keeps AES-256 keys in process memory and, optionally, in
//! an owner-only key file. It offers weaker guarantees than an OS keystore or
//! TPM: anyone who can read the key file and the vault file can recover keys.

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use base64::Engine;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::PathBuf;
use zeroize::Zeroizing;

use crate::fsutil;
use crate::vault::{VaultError, VaultResult};

/// AES-GCM nonce length in bytes.
pub const IV_LEN: usize = 12;

/// Output of a seal operation.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedBlob {
    pub ciphertext: Vec<u8>,
    pub iv: [u8; IV_LEN],
}

impl std::fmt::Debug for SealedBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedBlob")
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

/// Platform secure storage. Keys referenced by alias never leave it.
pub trait SecureEnclave: Send + Sync {
    /// Create the key for `alias` unless it already exists.
    fn ensure_key(&self, alias: &str) -> VaultResult<()>;

    /// Authenticated encryption under `alias` with a fresh IV.
    fn seal(&self, alias: &str, plaintext: &[u8], aad: &[u8]) -> VaultResult<SealedBlob>;

    fn open(&self, alias: &str, ciphertext: &[u8], iv: &[u8], aad: &[u8])
        -> VaultResult<Zeroizing<Vec<u8>>>;

    /// Remove the key. Unknown aliases are not an error.
    fn delete_key(&self, alias: &str) -> VaultResult<()>;
}

type KeyBytes = Zeroizing<[u8; 32]>;

/// AES-256-GCM enclave in software.
pub struct SoftwareEnclave {
    keys: DashMap<String, KeyBytes>,
    key_path: Option<PathBuf>,
}

impl SoftwareEnclave {
    /// Keys live only as long as the process.
    pub fn ephemeral() -> Self {
        Self {
            keys: DashMap::new(),
            key_path: None,
        }
    }

    /// Load keys from `path` if present; later changes are written back.
    pub fn open_file(path: impl Into<PathBuf>) -> VaultResult<Self> {
        let path = path.into();
        let keys = DashMap::new();

        let stored: Option<BTreeMap<String, String>> = fsutil::read_json(&path)?;
        for (alias, encoded) in stored.unwrap_or_default() {
            let bytes = Zeroizing::new(
                base64::engine::general_purpose::STANDARD
                    .decode(encoded.as_bytes())
                    .map_err(|_| VaultError::KeyUnavailable(alias.clone()))?,
            );
            let mut key = Zeroizing::new([0u8; 32]);
            if bytes.len() != key.len() {
                return Err(VaultError::KeyUnavailable(alias));
            }
            key.copy_from_slice(&bytes);
            keys.insert(alias, key);
        }

        tracing::info!(path = %path.display(), keys = keys.len(), "Software enclave loaded");
        Ok(Self {
            keys,
            key_path: Some(path),
        })
    }

    fn persist(&self) -> VaultResult<()> {
        let Some(path) = &self.key_path else {
            return Ok(());
        };
        let encoded: Vec<(String, Zeroizing<String>)> = self
            .keys
            .iter()
            .map(|entry| {
                let key = base64::engine::general_purpose::STANDARD.encode(&entry.value()[..]);
                (entry.key().clone(), Zeroizing::new(key))
            })
            .collect();
        let map: BTreeMap<&str, &str> = encoded.iter().map(|(a, k)| (a.as_str(), k.as_str())).collect();
        fsutil::write_json_atomic(path, &map)?;
        Ok(())
    }

    fn cipher(&self, alias: &str) -> VaultResult<Aes256Gcm> {
        let key = self
            .keys
            .get(alias)
            .ok_or_else(|| VaultError::KeyUnavailable(alias.to_string()))?;
        Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.value()[..])))
    }
}

impl SecureEnclave for SoftwareEnclave {
    fn ensure_key(&self, alias: &str) -> VaultResult<()> {
        if self.keys.contains_key(alias) {
            return Ok(());
        }
        let generated = Aes256Gcm::generate_key(OsRng);
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(generated.as_slice());
        self.keys.entry(alias.to_string()).or_insert(key);
        self.persist()
    }

    fn seal(&self, alias: &str, plaintext: &[u8], aad: &[u8]) -> VaultResult<SealedBlob> {
        let cipher = self.cipher(alias)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, Payload { msg: plaintext, aad })
            .map_err(|e| VaultError::Seal(e.to_string()))?;

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(nonce.as_slice());
        Ok(SealedBlob { ciphertext, iv })
    }

    fn open(
        &self,
        alias: &str,
        ciphertext: &[u8],
        iv: &[u8],
        aad: &[u8],
    ) -> VaultResult<Zeroizing<Vec<u8>>> {
        if iv.len() != IV_LEN {
            return Err(VaultError::Decrypt);
        }
        let cipher = self.cipher(alias)?;
        cipher
            .decrypt(Nonce::from_slice(iv), Payload { msg: ciphertext, aad })
            .map(Zeroizing::new)
            .map_err(|_| VaultError::Decrypt)
    }

    fn delete_key(&self, alias: &str) -> VaultResult<()> {
        if self.keys.remove(alias).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for SoftwareEnclave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareEnclave")
            .field("keys", &self.keys.len())
            .field("key_path", &self.key_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open() {
        let enclave = SoftwareEnclave::ephemeral();
        enclave.ensure_key("a").unwrap();

        let blob = enclave.seal("a", b"secret", b"wallet-1").unwrap();
        assert_ne!(blob.ciphertext, b"secret".to_vec());
        let opened = enclave.open("a", &blob.ciphertext, &blob.iv, b"wallet-1").unwrap();
        assert_eq!(opened.as_slice(), b"secret");
    }

    #[test]
    fn test_unknown_alias() {
        let enclave = SoftwareEnclave::ephemeral();
        assert!(matches!(
            enclave.seal("missing", b"x", b""),
            Err(VaultError::KeyUnavailable(alias)) if alias == "missing"
        ));
    }

    #[test]
    fn test_ensure_key_is_idempotent() {
        let enclave = SoftwareEnclave::ephemeral();
        enclave.ensure_key("a").unwrap();
        let blob = enclave.seal("a", b"payload", b"").unwrap();
        enclave.ensure_key("a").unwrap();
        assert!(enclave.open("a", &blob.ciphertext, &blob.iv, b"").is_ok());
    }

    #[test]
    fn test_keys_survive_reopen_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enclave.json");

        let blob = {
            let enclave = SoftwareEnclave::open_file(&path).unwrap();
            enclave.ensure_key("a").unwrap();
            enclave.seal("a", b"payload", b"w").unwrap()
        };

        let reopened = SoftwareEnclave::open_file(&path).unwrap();
        let opened = reopened.open("a", &blob.ciphertext, &blob.iv, b"w").unwrap();
        assert_eq!(opened.as_slice(), b"payload");

        reopened.delete_key("a").unwrap();
        let again = SoftwareEnclave::open_file(&path).unwrap();
        assert!(matches!(
            again.open("a", &blob.ciphertext, &blob.iv, b"w"),
            Err(VaultError::KeyUnavailable(_))
        ));
    }

    #[test]
    fn test_debug_hides_material() {
        let enclave = SoftwareEnclave::ephemeral();
        enclave.ensure_key("a").unwrap();
        let blob = enclave.seal("a", b"payload", b"").unwrap();
        assert!(!format!("{:?}", blob).contains("ciphertext:"));
        assert!(format!("{:?}", enclave).contains("keys: 1"));
    }
}
