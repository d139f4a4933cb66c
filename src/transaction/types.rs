//! Addresses, checkpoints and the unsigned/signed transaction envelopes.

use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::transaction::message::Message;

/// Errors parsing base58 keys and hashes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseKeyError {
    #[error("invalid base58: {0}")]
    Base58(String),

    #[error("expected 32 bytes, got {0}")]
    Length(usize),
}

fn decode_32(s: &str) -> Result<[u8; 32], ParseKeyError> {
    let bytes = bs58::decode(s)
        .into_vec()
        .map_err(|e| ParseKeyError::Base58(e.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| ParseKeyError::Length(bytes.len()))
}

/// A 32-byte ed25519 public key; doubles as the account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pubkey([u8; 32]);

impl Pubkey {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for Pubkey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_32(s).map(Self)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self)
    }
}

impl Serialize for Pubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Recent network checkpoint (blockhash) bounding a transaction's validity window.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Checkpoint([u8; 32]);

impl Checkpoint {
    /// All-zero placeholder used until the real checkpoint is fetched.
    pub const PLACEHOLDER: Checkpoint = Checkpoint([0u8; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_placeholder(&self) -> bool {
        *self == Self::PLACEHOLDER
    }
}

impl FromStr for Checkpoint {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_32(s).map(Self)
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checkpoint({})", self)
    }
}

/// A 64-byte ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

/// Metadata carried alongside the opaque payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionEnvelope {
    pub fee_payer: Pubkey,
    pub checkpoint: Checkpoint,
    pub instruction_count: usize,
}

/// A transaction before its signature is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    message: Message,
}

impl UnsignedTransaction {
    pub(crate) fn new(message: Message) -> Self {
        Self { message }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Replace the checkpoint. Only meaningful before signing.
    pub fn with_checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.message.recent_checkpoint = checkpoint;
        self
    }

    pub fn envelope(&self) -> TransactionEnvelope {
        TransactionEnvelope {
            fee_payer: self.message.fee_payer(),
            checkpoint: self.message.recent_checkpoint,
            instruction_count: self.message.instructions.len(),
        }
    }

    /// The bytes a signer signs.
    pub fn message_bytes(&self) -> Vec<u8> {
        self.message.serialize()
    }

    /// Wire form with zeroed signature slots, suitable for simulation.
    pub fn to_wire(&self) -> Vec<u8> {
        let slots = self.message.header.num_required_signatures as usize;
        encode_wire(&vec![[0u8; 64]; slots], &self.message_bytes())
    }

    pub fn to_wire_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.to_wire())
    }
}

/// A transaction with its fee-payer signature. Immutable: any change would
/// invalidate the signature, so there are no mutators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    signature: Signature,
    message_bytes: Vec<u8>,
    envelope: TransactionEnvelope,
}

impl SignedTransaction {
    /// Attach `signature`, which must cover `unsigned.message_bytes()`.
    pub(crate) fn new(unsigned: &UnsignedTransaction, signature: Signature) -> Self {
        Self {
            signature,
            message_bytes: unsigned.message_bytes(),
            envelope: unsigned.envelope(),
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn envelope(&self) -> &TransactionEnvelope {
        &self.envelope
    }

    pub fn message_bytes(&self) -> &[u8] {
        &self.message_bytes
    }

    /// The network hash this transaction will be known by.
    pub fn hash(&self) -> String {
        self.signature.to_string()
    }

    pub fn to_wire(&self) -> Vec<u8> {
        encode_wire(&[*self.signature.as_bytes()], &self.message_bytes)
    }

    pub fn to_wire_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.to_wire())
    }
}

fn encode_wire(signatures: &[[u8; 64]], message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(3 + signatures.len() * 64 + message.len());
    crate::transaction::message::encode_shortvec_len(&mut out, signatures.len());
    for sig in signatures {
        out.extend_from_slice(sig);
    }
    out.extend_from_slice(message);
    out
}
