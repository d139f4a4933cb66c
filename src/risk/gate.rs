//! User-confirmation extension point.

use async_trait::async_trait;

use crate::risk::{RiskAssessment, RiskLevel};

/// Asked before signing whenever an assessment is not clean.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    /// Return true to proceed to signing.
    async fn confirm(&self, assessment: &RiskAssessment) -> bool;
}

/// Default gate without a user in the loop: proceeds on warnings, refuses
/// DANGEROUS and MALICIOUS.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectUnsafe;

#[async_trait]
impl ConfirmationGate for RejectUnsafe {
    async fn confirm(&self, assessment: &RiskAssessment) -> bool {
        if assessment.level.is_blocking() {
            tracing::warn!(level = %assessment.level, warnings = ?assessment.warnings, "Refusing risky transaction");
            return false;
        }
        if assessment.level >= RiskLevel::Suspicious {
            tracing::warn!(level = %assessment.level, warnings = ?assessment.warnings, "Proceeding despite warnings");
        }
        true
    }
}
