//! Legacy message layout and its compact encoding.
//!
//! ```text
//! header (3 bytes) | shortvec keys | 32 x keys | checkpoint (32) | shortvec instructions
//! instruction: program index (u8) | shortvec accounts | indices | shortvec data | data
//! ```

use thiserror::Error;

use crate::transaction::types::{Checkpoint, Pubkey};

/// Errors decoding a serialized message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("message truncated at byte {0}")]
    Truncated(usize),

    #[error("invalid shortvec length prefix")]
    InvalidLength,

    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    #[error("message has no signer")]
    NoSigner,

    #[error("message requires {required} signers but lists only {keys} account keys")]
    MissingSignerKeys { required: usize, keys: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    /// Signers first (fee payer at index 0), then writable, then readonly accounts.
    pub account_keys: Vec<Pubkey>,
    pub recent_checkpoint: Checkpoint,
    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// First account key. Decoded messages always have one; built messages
    /// always put the sender there.
    pub fn fee_payer(&self) -> Pubkey {
        self.account_keys[0]
    }

    /// Program keys referenced by the instructions, in instruction order.
    pub fn program_ids(&self) -> impl Iterator<Item = &Pubkey> + '_ {
        self.instructions
            .iter()
            .filter_map(|ix| self.account_keys.get(ix.program_id_index as usize))
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(3 + 1 + self.account_keys.len() * 32 + 32 + 64);
        out.push(self.header.num_required_signatures);
        out.push(self.header.num_readonly_signed);
        out.push(self.header.num_readonly_unsigned);

        encode_shortvec_len(&mut out, self.account_keys.len());
        for key in &self.account_keys {
            out.extend_from_slice(key.as_bytes());
        }

        out.extend_from_slice(self.recent_checkpoint.as_bytes());

        encode_shortvec_len(&mut out, self.instructions.len());
        for ix in &self.instructions {
            out.push(ix.program_id_index);
            encode_shortvec_len(&mut out, ix.accounts.len());
            out.extend_from_slice(&ix.accounts);
            encode_shortvec_len(&mut out, ix.data.len());
            out.extend_from_slice(&ix.data);
        }
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, MessageError> {
        let mut cursor = Cursor { bytes, pos: 0 };

        let header = MessageHeader {
            num_required_signatures: cursor.byte()?,
            num_readonly_signed: cursor.byte()?,
            num_readonly_unsigned: cursor.byte()?,
        };
        if header.num_required_signatures == 0 {
            return Err(MessageError::NoSigner);
        }

        let key_count = cursor.shortvec()?;
        let mut account_keys = Vec::with_capacity(key_count.min(64));
        for _ in 0..key_count {
            account_keys.push(Pubkey::from_bytes(cursor.array32()?));
        }
        let required = header.num_required_signatures as usize;
        if account_keys.len() < required {
            return Err(MessageError::MissingSignerKeys {
                required,
                keys: account_keys.len(),
            });
        }

        let recent_checkpoint = Checkpoint::from_bytes(cursor.array32()?);

        let ix_count = cursor.shortvec()?;
        let mut instructions = Vec::with_capacity(ix_count.min(64));
        for _ in 0..ix_count {
            let program_id_index = cursor.byte()?;
            let n = cursor.shortvec()?;
            let accounts = cursor.take(n)?.to_vec();
            let n = cursor.shortvec()?;
            let data = cursor.take(n)?.to_vec();
            instructions.push(CompiledInstruction {
                program_id_index,
                accounts,
                data,
            });
        }

        let rest = bytes.len() - cursor.pos;
        if rest != 0 {
            return Err(MessageError::TrailingBytes(rest));
        }

        Ok(Self {
            header,
            account_keys,
            recent_checkpoint,
            instructions,
        })
    }
}

/// Append a shortvec (compact-u16) length prefix.
pub fn encode_shortvec_len(out: &mut Vec<u8>, len: usize) {
    let mut rem = len as u16;
    loop {
        let mut elem = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(elem);
            break;
        }
        elem |= 0x80;
        out.push(elem);
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], MessageError> {
        let end = self.pos.checked_add(n).ok_or(MessageError::Truncated(self.pos))?;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(MessageError::Truncated(self.pos))?;
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8, MessageError> {
        Ok(self.take(1)?[0])
    }

    fn array32(&mut self) -> Result<[u8; 32], MessageError> {
        let mut out = [0u8; 32];
        out.copy_from_slice(self.take(32)?);
        Ok(out)
    }

    fn shortvec(&mut self) -> Result<usize, MessageError> {
        let mut value: usize = 0;
        for i in 0..3 {
            let b = self.byte()?;
            value |= ((b & 0x7f) as usize) << (i * 7);
            if b & 0x80 == 0 {
                if value > u16::MAX as usize {
                    return Err(MessageError::InvalidLength);
                }
                return Ok(value);
            }
        }
        Err(MessageError::InvalidLength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(len: usize) -> Vec<u8> {
        let mut out = Vec::new();
        encode_shortvec_len(&mut out, len);
        out
    }

    #[test]
    fn test_shortvec_encoding() {
        assert_eq!(encoded(0), vec![0x00]);
        assert_eq!(encoded(0x7f), vec![0x7f]);
        assert_eq!(encoded(0x80), vec![0x80, 0x01]);
        assert_eq!(encoded(0x3fff), vec![0xff, 0x7f]);
        assert_eq!(encoded(0x4000), vec![0x80, 0x80, 0x01]);
    }

    #[test]
    fn test_decode_matches_encoded_message() {
        let message = Message {
            header: MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed: 0,
                num_readonly_unsigned: 1,
            },
            account_keys: vec![
                Pubkey::from_bytes([1; 32]),
                Pubkey::from_bytes([2; 32]),
                Pubkey::from_bytes([0; 32]),
            ],
            recent_checkpoint: Checkpoint::from_bytes([3; 32]),
            instructions: vec![CompiledInstruction {
                program_id_index: 2,
                accounts: vec![0, 1],
                data: vec![2, 0, 0, 0, 64, 66, 15, 0, 0, 0, 0, 0],
            }],
        };

        let bytes = message.serialize();
        assert_eq!(&bytes[..4], &[1, 0, 1, 3]);
        assert_eq!(Message::deserialize(&bytes).unwrap(), message);
        assert_eq!(message.program_ids().collect::<Vec<_>>(), vec![&Pubkey::from_bytes([0; 32])]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(Message::deserialize(&[]), Err(MessageError::Truncated(0)));
        assert_eq!(Message::deserialize(&[0, 0, 0]), Err(MessageError::NoSigner));
        assert_eq!(
            Message::deserialize(&[1, 0, 0, 0xff, 0xff, 0xff]),
            Err(MessageError::InvalidLength)
        );
    }

    #[test]
    fn test_decode_requires_a_key_per_signer() {
        let mut bytes = vec![1, 0, 0, 0];
        bytes.extend_from_slice(&[3; 32]);
        bytes.push(0);
        assert_eq!(
            Message::deserialize(&bytes),
            Err(MessageError::MissingSignerKeys { required: 1, keys: 0 })
        );

        let mut bytes = vec![2, 0, 0, 1];
        bytes.extend_from_slice(&[1; 32]);
        bytes.extend_from_slice(&[3; 32]);
        bytes.push(0);
        assert_eq!(
            Message::deserialize(&bytes),
            Err(MessageError::MissingSignerKeys { required: 2, keys: 1 })
        );

        let mut bytes = vec![1, 0, 0, 1];
        bytes.extend_from_slice(&[1; 32]);
        bytes.extend_from_slice(&[3; 32]);
        bytes.push(0);
        assert_eq!(Message::deserialize(&bytes).unwrap().fee_payer(), Pubkey::from_bytes([1; 32]));
    }
}
