//! Transfer assembly.
//!
//! # Responsibilities
//! - Validate recipient, amount and memo
//! - Compile the transfer (plus optional priority-fee and memo instructions) into a message
//! - Leave the checkpoint as a placeholder; it is filled right before signing
//!
//! The builder is pure: identical intents produce identical bytes.

use thiserror::Error;

use crate::transaction::message::{CompiledInstruction, Message, MessageHeader};
use crate::transaction::types::{Checkpoint, Pubkey, UnsignedTransaction};

pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::from_bytes([0u8; 32]);

/// `MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr`
pub const MEMO_PROGRAM_ID: Pubkey = Pubkey::from_bytes([
    5, 74, 83, 90, 153, 41, 33, 6, 77, 36, 232, 113, 96, 218, 56, 124, 124, 53, 181, 221, 188,
    146, 187, 129, 228, 31, 168, 64, 65, 5, 68, 141,
]);

/// `ComputeBudget111111111111111111111111111111`
pub const COMPUTE_BUDGET_PROGRAM_ID: Pubkey = Pubkey::from_bytes([
    3, 6, 70, 111, 229, 33, 23, 50, 255, 236, 173, 186, 114, 195, 155, 231, 188, 140, 229, 187,
    197, 247, 18, 107, 44, 67, 155, 58, 64, 0, 0, 0,
]);

/// Largest serialized transaction the network accepts.
pub const MAX_TRANSACTION_SIZE: usize = 1232;

pub const MAX_MEMO_BYTES: usize = 566;

const SYSTEM_TRANSFER: u32 = 2;
const SET_COMPUTE_UNIT_LIMIT: u8 = 2;
const SET_COMPUTE_UNIT_PRICE: u8 = 3;

/// Reasons an intent cannot be turned into a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("recipient '{0}' is not a valid address")]
    InvalidAddress(String),

    #[error("amount must be a positive integer")]
    NonPositiveAmount,

    #[error("recipient must differ from the sender")]
    SelfTransfer,

    #[error("memo is {0} bytes, the limit is {max}", max = MAX_MEMO_BYTES)]
    MemoTooLong(usize),

    #[error("transaction is {0} bytes, the limit is {max}", max = MAX_TRANSACTION_SIZE)]
    TooLarge(usize),
}

/// Priority fee attached through the compute-budget program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityFee {
    pub compute_unit_limit: u32,
    /// Price per compute unit in micro-units.
    pub micro_price: u64,
}

impl PriorityFee {
    /// Total priority fee in the smallest unit, rounded up.
    pub fn total(&self) -> u64 {
        let micro = self.micro_price as u128 * self.compute_unit_limit as u128;
        micro.div_ceil(1_000_000).min(u64::MAX as u128) as u64
    }
}

/// A native transfer request.
#[derive(Debug, Clone)]
pub struct TransferIntent<'a> {
    pub from: Pubkey,
    pub to: &'a str,
    pub amount: u64,
    pub memo: Option<&'a str>,
    pub priority_fee: Option<PriorityFee>,
}

/// Stateless transaction builder.
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder;

impl TransactionBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Assemble an unsigned transfer with a placeholder checkpoint.
    pub fn build_transfer(&self, intent: &TransferIntent<'_>) -> Result<UnsignedTransaction, BuildError> {
        let to: Pubkey = intent
            .to
            .trim()
            .parse()
            .map_err(|_| BuildError::InvalidAddress(intent.to.to_string()))?;
        if intent.amount == 0 {
            return Err(BuildError::NonPositiveAmount);
        }
        if to == intent.from {
            return Err(BuildError::SelfTransfer);
        }
        let memo = intent.memo.filter(|m| !m.is_empty());
        if let Some(memo) = memo {
            if memo.len() > MAX_MEMO_BYTES {
                return Err(BuildError::MemoTooLong(memo.len()));
            }
        }
        let priority = intent.priority_fee.filter(|p| p.micro_price > 0);

        // Writable signer, writable recipient, then readonly programs.
        let mut account_keys = vec![intent.from, to, SYSTEM_PROGRAM_ID];
        let compute_index = priority.map(|_| push_key(&mut account_keys, COMPUTE_BUDGET_PROGRAM_ID));
        let memo_index = memo.map(|_| push_key(&mut account_keys, MEMO_PROGRAM_ID));

        let mut instructions = Vec::with_capacity(4);
        if let (Some(fee), Some(index)) = (priority, compute_index) {
            let mut limit = vec![SET_COMPUTE_UNIT_LIMIT];
            limit.extend_from_slice(&fee.compute_unit_limit.to_le_bytes());
            instructions.push(CompiledInstruction {
                program_id_index: index,
                accounts: Vec::new(),
                data: limit,
            });

            let mut price = vec![SET_COMPUTE_UNIT_PRICE];
            price.extend_from_slice(&fee.micro_price.to_le_bytes());
            instructions.push(CompiledInstruction {
                program_id_index: index,
                accounts: Vec::new(),
                data: price,
            });
        }

        let mut transfer = SYSTEM_TRANSFER.to_le_bytes().to_vec();
        transfer.extend_from_slice(&intent.amount.to_le_bytes());
        instructions.push(CompiledInstruction {
            program_id_index: 2,
            accounts: vec![0, 1],
            data: transfer,
        });

        if let (Some(memo), Some(index)) = (memo, memo_index) {
            instructions.push(CompiledInstruction {
                program_id_index: index,
                accounts: Vec::new(),
                data: memo.as_bytes().to_vec(),
            });
        }

        let message = Message {
            header: MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed: 0,
                num_readonly_unsigned: (account_keys.len() - 2) as u8,
            },
            account_keys,
            recent_checkpoint: Checkpoint::PLACEHOLDER,
            instructions,
        };

        let unsigned = UnsignedTransaction::new(message);
        let size = unsigned.to_wire().len();
        if size > MAX_TRANSACTION_SIZE {
            return Err(BuildError::TooLarge(size));
        }
        Ok(unsigned)
    }
}

fn push_key(keys: &mut Vec<Pubkey>, key: Pubkey) -> u8 {
    keys.push(key);
    (keys.len() - 1) as u8
}
