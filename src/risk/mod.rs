//! Pre-signing risk classification.
//!
//! # Data Flow
//! ```text
//! unsigned bytes → RiskScanner::analyze → RiskAssessment
//!     SAFE                     → continue
//!     SUSPICIOUS               → ConfirmationGate decides
//!     DANGEROUS / MALICIOUS    → ConfirmationGate decides (default: reject)
//! ```
//!
//! # Design Decisions
//! - Scanning is synchronous and stateless
//! - Without threat intelligence the scanner fails open (SAFE, no warnings)
//! - Assessments live only for one signing attempt

pub mod gate;
pub mod scanner;

use serde::Serialize;
use std::fmt;

pub use gate::{ConfirmationGate, RejectUnsafe};
pub use scanner::{PolicyRiskScanner, RiskScanner};

/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Safe,
    Suspicious,
    Dangerous,
    Malicious,
}

impl RiskLevel {
    /// DANGEROUS and MALICIOUS stop the lifecycle unless overridden.
    pub fn is_blocking(self) -> bool {
        matches!(self, RiskLevel::Dangerous | RiskLevel::Malicious)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Safe => "SAFE",
            RiskLevel::Suspicious => "SUSPICIOUS",
            RiskLevel::Dangerous => "DANGEROUS",
            RiskLevel::Malicious => "MALICIOUS",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RiskDetails {
    pub known_scam: bool,
    pub unusual_permissions: Vec<String>,
    pub suspicious_recipients: Vec<String>,
    /// Smallest-unit amount at stake, when it can be determined.
    pub estimated_loss: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub warnings: Vec<String>,
    pub details: RiskDetails,
}

impl RiskAssessment {
    pub fn safe() -> Self {
        Self {
            level: RiskLevel::Safe,
            warnings: Vec::new(),
            details: RiskDetails::default(),
        }
    }

    /// SAFE with no warnings: the only result fail-closed callers accept.
    pub fn is_clean(&self) -> bool {
        self.level == RiskLevel::Safe && self.warnings.is_empty()
    }
}
