use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::assessment::DomainAssessment;
use super::identity::UrlId;
use super::reputation::{ReputationStatus, ReputationVerdict};

/// Fused, user-facing trust label for a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Safe,
    PotentiallyUnsafe,
    Unsafe,
    Unknown,
    NonExistent,
    Error,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::PotentiallyUnsafe => "POTENTIALLY_UNSAFE",
            Self::Unsafe => "UNSAFE",
            Self::Unknown => "UNKNOWN",
            Self::NonExistent => "NON_EXISTENT",
            Self::Error => "ERROR",
        }
    }

    /// Only an inconclusive verdict is worth evaluating again.
    pub fn needs_reevaluation(&self) -> bool {
        matches!(self, OverallStatus::Unknown)
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the host-level block side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockStatus {
    Blocked,
    AlreadyBlocked,
    PermissionDenied,
    Error,
}

impl BlockStatus {
    /// `Blocked` and `AlreadyBlocked` both mean the domain is now blocked.
    pub fn is_effective(&self) -> bool {
        matches!(self, BlockStatus::Blocked | BlockStatus::AlreadyBlocked)
    }
}

/// Persisted decision for a URL. Superseded, never edited, on re-evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustVerdict {
    pub id: UrlId,
    pub url: String,
    pub domain: String,
    pub overall: OverallStatus,
    pub message: String,
    pub domain_assessment: DomainAssessment,
    pub reputation_verdict: Option<ReputationVerdict>,
    pub block_status: Option<BlockStatus>,
    pub narrative_summary: Option<String>,
    /// Evaluation attempts spent producing this verdict.
    #[serde(default)]
    pub attempts: u32,
    pub evaluated_at: DateTime<Utc>,
}

impl TrustVerdict {
    /// True when both sources produced data and the fused label is conclusive.
    pub fn is_complete(&self) -> bool {
        let reputation_ok = self
            .reputation_verdict
            .as_ref()
            .map(|r| r.status != ReputationStatus::Error)
            .unwrap_or(false);
        reputation_ok
            && !self.domain_assessment.findings.is_empty()
            && !matches!(self.overall, OverallStatus::Unknown | OverallStatus::Error)
    }
}
