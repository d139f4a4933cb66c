//! Key management.
//!
//! Handles BIP39 mnemonic generation, deterministic derivation of the ed25519
//! keypair and signing of arbitrary payloads.
//!
//! # Derivation schemes
//! - `Slip10`: SLIP-0010 along `m/44'/501'/0'/0'`. Phrases imported here yield the
//!   same address as in mainstream wallets on the chain.
//! - `RawSeedSlice`: the first 32 bytes of the BIP39 seed used directly as the
//!   private key. Addresses do NOT match mainstream wallets; kept only so keys
//!   created under that scheme stay recoverable.
//!
//! Security: mnemonics and secret scalars live in `Zeroizing` buffers and are
//! overwritten when dropped. Nothing in this module logs secret material.

use bip39::{Language, Mnemonic, MnemonicType, Seed};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::transaction::{Pubkey, Signature};

/// Hardened SLIP-0010 path components (`m/44'/501'/0'/0'`).
pub const DERIVATION_PATH: [u32; 4] = [44, 501, 0, 0];

/// Length of an ed25519 secret scalar seed.
pub const SECRET_KEY_LEN: usize = 32;

/// Errors from mnemonic handling and signing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid recovery phrase: {0}")]
    InvalidMnemonic(String),

    #[error("expected a 12 or 24 word recovery phrase, got {0} words")]
    WordCount(usize),

    #[error("secret key must be {len} bytes, got {0}", len = SECRET_KEY_LEN)]
    SecretLength(usize),
}

/// How a recovery phrase becomes a private key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivationScheme {
    #[default]
    Slip10,
    RawSeedSlice,
}

/// An ed25519 keypair. The secret half is wiped on drop.
pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    /// Build from a raw 32-byte secret.
    pub fn from_secret(secret: &[u8]) -> Result<Self, KeyError> {
        let bytes: &[u8; SECRET_KEY_LEN] = secret
            .try_into()
            .map_err(|_| KeyError::SecretLength(secret.len()))?;
        Ok(Self {
            signing: SigningKey::from_bytes(bytes),
        })
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey::from_bytes(self.signing.verifying_key().to_bytes())
    }

    /// Copy of the secret for handing to the vault. Zeroed when dropped.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; SECRET_KEY_LEN]> {
        Zeroizing::new(self.signing.to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature::from_bytes(self.signing.sign(message).to_bytes())
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Generate a fresh 12-word phrase (128 bits of entropy) and its keypair.
pub fn generate(scheme: DerivationScheme) -> (Zeroizing<String>, Keypair) {
    let mnemonic = Mnemonic::new(MnemonicType::Words12, Language::English);
    let keypair = derive(&mnemonic, scheme);
    (Zeroizing::new(mnemonic.phrase().to_string()), keypair)
}

/// Restore the keypair for a 12- or 24-word phrase.
pub fn from_mnemonic(phrase: &str, scheme: DerivationScheme) -> Result<Keypair, KeyError> {
    let normalized = Zeroizing::new(
        phrase
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" "),
    );

    let words = normalized.split(' ').filter(|w| !w.is_empty()).count();
    if words != 12 && words != 24 {
        return Err(KeyError::WordCount(words));
    }

    let mnemonic = Mnemonic::from_phrase(&normalized, Language::English)
        .map_err(|e| KeyError::InvalidMnemonic(e.to_string()))?;
    Ok(derive(&mnemonic, scheme))
}

fn derive(mnemonic: &Mnemonic, scheme: DerivationScheme) -> Keypair {
    let seed = Seed::new(mnemonic, "");
    let secret: Zeroizing<[u8; SECRET_KEY_LEN]> = match scheme {
        DerivationScheme::Slip10 => Zeroizing::new(slip10_ed25519::derive_ed25519_private_key(
            seed.as_bytes(),
            &DERIVATION_PATH,
        )),
        DerivationScheme::RawSeedSlice => {
            let mut out = Zeroizing::new([0u8; SECRET_KEY_LEN]);
            out.copy_from_slice(&seed.as_bytes()[..SECRET_KEY_LEN]);
            out
        }
    };
    Keypair {
        signing: SigningKey::from_bytes(&secret),
    }
}

/// Sign `message` with a raw secret. Returns the signer's public key alongside
/// the signature so callers can check it against the expected fee payer.
pub fn sign(message: &[u8], secret: &[u8]) -> Result<(Pubkey, Signature), KeyError> {
    let keypair = Keypair::from_secret(secret)?;
    Ok((keypair.pubkey(), keypair.sign(message)))
}

/// Verify an ed25519 signature.
pub fn verify(pubkey: &Pubkey, message: &[u8], signature: &Signature) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(pubkey.as_bytes()) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
    key.verify(message, &sig).is_ok()
}
