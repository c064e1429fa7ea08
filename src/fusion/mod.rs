use serde::{Deserialize, Serialize};

use crate::models::{DomainClassification, OverallStatus, ReputationStatus};

/// Which source wins when domain analysis and the reputation scan disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionPolicy {
    /// An unsafe signal from either source is never outvoted.
    #[default]
    FailClosed,
    /// A clean reputation scan outvotes risky domain analysis.
    ReputationFirst,
}

type Cell = (OverallStatus, &'static str);
type Table = [[Cell; 5]; 5];

use OverallStatus::{NonExistent as NX, PotentiallyUnsafe as PU, Safe as S, Unknown as UNK, Unsafe as US};

const NON_EXISTENT: Cell = (NX, "Domain does not exist in DNS");

// Rows: domain classification. Columns: reputation status.
// Order for both follows their `index()`: SAFE, POTENTIALLY_UNSAFE, UNSAFE, UNKNOWN, (ERROR | NON_EXISTENT).
const FAIL_CLOSED: Table = [
    // domain SAFE
    [
        (S, "Both the reputation scan and domain analysis indicate the URL is safe"),
        (PU, "Reputation scan reports suspicious detections; domain analysis found no significant risk"),
        (US, "Detected as unsafe by the reputation scan"),
        (UNK, "Reputation scan is inconclusive, but domain analysis indicates the URL is safe"),
        (UNK, "Reputation scan failed; domain analysis alone cannot confirm the URL is safe"),
    ],
    // domain POTENTIALLY_UNSAFE
    [
        (PU, "Reputation scan indicates safe, but domain analysis found potential risks"),
        (PU, "Both the reputation scan and domain analysis found potential risks"),
        (US, "Detected as unsafe by the reputation scan, and domain analysis also found potential risks"),
        (UNK, "Reputation scan is inconclusive, and domain analysis found potential risks"),
        (UNK, "Reputation scan failed, and domain analysis found potential risks"),
    ],
    // domain UNSAFE
    [
        (US, "Reputation scan indicates safe, but domain analysis found high risk"),
        (US, "Domain analysis found high risk, and the reputation scan reports suspicious detections"),
        (US, "Detected as unsafe by both the reputation scan and domain analysis"),
        (US, "Domain analysis found high risk; reputation scan is inconclusive"),
        (US, "Domain analysis found high risk; reputation scan failed"),
    ],
    // domain UNKNOWN
    [
        (UNK, "Domain analysis is inconclusive, but the reputation scan indicates the URL is safe"),
        (UNK, "Domain analysis is inconclusive, and the reputation scan reports suspicious detections"),
        (US, "Detected as unsafe by the reputation scan; domain analysis is inconclusive"),
        (UNK, "Both the reputation scan and domain analysis are inconclusive"),
        (UNK, "Domain analysis is inconclusive and the reputation scan failed"),
    ],
    // domain NON_EXISTENT
    [NON_EXISTENT; 5],
];

const REPUTATION_FIRST: Table = [
    FAIL_CLOSED[0],
    [
        (S, "Reputation scan indicates safe, but domain analysis found potential risks"),
        FAIL_CLOSED[1][1],
        FAIL_CLOSED[1][2],
        FAIL_CLOSED[1][3],
        FAIL_CLOSED[1][4],
    ],
    [
        (S, "Reputation scan indicates safe, but domain analysis found high risk"),
        FAIL_CLOSED[2][1],
        FAIL_CLOSED[2][2],
        (PU, "Domain analysis found high risk, but the reputation scan is inconclusive"),
        (PU, "Domain analysis found high risk, but the reputation scan failed"),
    ],
    FAIL_CLOSED[3],
    FAIL_CLOSED[4],
];

impl FusionPolicy {
    fn table(&self) -> &'static Table {
        match self {
            FusionPolicy::FailClosed => &FAIL_CLOSED,
            FusionPolicy::ReputationFirst => &REPUTATION_FIRST,
        }
    }
}

/// Combine the domain classification and reputation status into one verdict.
/// Total over all 25 combinations.
pub fn fuse(
    domain: DomainClassification,
    reputation: ReputationStatus,
    policy: FusionPolicy,
) -> (OverallStatus, String) {
    let (overall, message) = policy.table()[domain.index()][reputation.index()];
    (overall, message.to_string())
}
