use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReputationStatus {
    Safe,
    PotentiallyUnsafe,
    Unsafe,
    Unknown,
    Error,
}

impl ReputationStatus {
    pub const ALL: [ReputationStatus; 5] = [
        Self::Safe,
        Self::PotentiallyUnsafe,
        Self::Unsafe,
        Self::Unknown,
        Self::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::PotentiallyUnsafe => "POTENTIALLY_UNSAFE",
            Self::Unsafe => "UNSAFE",
            Self::Unknown => "UNKNOWN",
            Self::Error => "ERROR",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Safe => 0,
            Self::PotentiallyUnsafe => 1,
            Self::Unsafe => 2,
            Self::Unknown => 3,
            Self::Error => 4,
        }
    }
}

/// Engine detection counts reported by the scan service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DetectionStats {
    #[serde(default)]
    pub malicious: u32,
    #[serde(default)]
    pub suspicious: u32,
    #[serde(default)]
    pub undetected: u32,
    #[serde(default)]
    pub harmless: u32,
    #[serde(default)]
    pub timeout: u32,
}

impl DetectionStats {
    /// Maps detection counts to a status. First match wins.
    pub fn derive_status(&self) -> (ReputationStatus, String) {
        if self.malicious > 0 {
            (
                ReputationStatus::Unsafe,
                format!("Malicious detections: {}, Suspicious: {}", self.malicious, self.suspicious),
            )
        } else if self.suspicious > 0 {
            (
                ReputationStatus::PotentiallyUnsafe,
                format!("Suspicious detections: {}, no malicious findings", self.suspicious),
            )
        } else if self.timeout > 0 && self.undetected + self.harmless == 0 {
            (
                ReputationStatus::Unknown,
                "Analysis timed out with no conclusive results".to_string(),
            )
        } else {
            (
                ReputationStatus::Safe,
                "No malicious or suspicious detections".to_string(),
            )
        }
    }
}

/// Normalized outcome of one reputation submission cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationVerdict {
    pub status: ReputationStatus,
    pub message: String,
    pub stats: DetectionStats,
    /// Engine name to that engine's verdict (e.g. "clean", "phishing").
    #[serde(default)]
    pub raw_engine_results: BTreeMap<String, String>,
}

impl ReputationVerdict {
    pub fn from_stats(stats: DetectionStats, raw_engine_results: BTreeMap<String, String>) -> Self {
        let (status, message) = stats.derive_status();
        Self { status, message, stats, raw_engine_results }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ReputationStatus::Error,
            message: message.into(),
            stats: DetectionStats::default(),
            raw_engine_results: BTreeMap::new(),
        }
    }
}
