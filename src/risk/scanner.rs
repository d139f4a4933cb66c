//! Risk scanners.

use std::collections::HashSet;

use crate::risk::{RiskAssessment, RiskDetails, RiskLevel};
use crate::transaction::builder::{
    COMPUTE_BUDGET_PROGRAM_ID, MEMO_PROGRAM_ID, SYSTEM_PROGRAM_ID,
};
use crate::transaction::{Message, Pubkey};

/// Classifies transaction bytes before signing.
pub trait RiskScanner: Send + Sync {
    /// `unsigned` is the serialized message the wallet is about to sign.
    fn analyze(&self, unsigned: &[u8]) -> RiskAssessment;
}

/// Local policy: a denylist of known-scam addresses and a list of programs the
/// wallet expects to invoke. Everything else is SAFE.
#[derive(Debug, Clone, Default)]
pub struct PolicyRiskScanner {
    blocked: HashSet<Pubkey>,
}

impl PolicyRiskScanner {
    pub fn new(blocked: impl IntoIterator<Item = Pubkey>) -> Self {
        Self {
            blocked: blocked.into_iter().collect(),
        }
    }

    fn is_known_program(key: &Pubkey) -> bool {
        *key == SYSTEM_PROGRAM_ID || *key == MEMO_PROGRAM_ID || *key == COMPUTE_BUDGET_PROGRAM_ID
    }
}

impl RiskScanner for PolicyRiskScanner {
    fn analyze(&self, unsigned: &[u8]) -> RiskAssessment {
        let message = match Message::deserialize(unsigned) {
            Ok(message) => message,
            Err(e) => {
                return RiskAssessment {
                    level: RiskLevel::Suspicious,
                    warnings: vec![format!("transaction could not be decoded: {}", e)],
                    details: RiskDetails::default(),
                }
            }
        };

        let mut assessment = RiskAssessment::safe();

        // Instruction order, first occurrence only, so warnings are stable.
        let mut programs: Vec<&Pubkey> = Vec::new();
        for program in message.program_ids() {
            if !programs.contains(&program) {
                programs.push(program);
            }
        }
        let signer_count = message.header.num_required_signatures as usize;
        for key in message.account_keys.iter().skip(signer_count) {
            if programs.contains(&key) {
                continue;
            }
            if self.blocked.contains(key) {
                assessment.details.known_scam = true;
                assessment.details.suspicious_recipients.push(key.to_string());
            }
        }
        if assessment.details.known_scam {
            assessment.level = RiskLevel::Malicious;
            assessment
                .warnings
                .push("recipient address is on the known-scam list".to_string());
            assessment.details.estimated_loss = transfer_amount(&message);
        }

        for program in programs {
            if !Self::is_known_program(program) {
                assessment.details.unusual_permissions.push(program.to_string());
                assessment
                    .warnings
                    .push(format!("invokes unrecognized program {}", program));
                assessment.level = assessment.level.max(RiskLevel::Suspicious);
            }
        }

        assessment
    }
}

/// Lamports moved by the first system transfer, if any.
fn transfer_amount(message: &Message) -> Option<u64> {
    message
        .instructions
        .iter()
        .filter(|ix| message.account_keys.get(ix.program_id_index as usize) == Some(&SYSTEM_PROGRAM_ID))
        .find_map(|ix| {
            let data = ix.data.get(..12)?;
            if data[..4] != 2u32.to_le_bytes() {
                return None;
            }
            let mut amount = [0u8; 8];
            amount.copy_from_slice(&data[4..12]);
            Some(u64::from_le_bytes(amount))
        })
}
