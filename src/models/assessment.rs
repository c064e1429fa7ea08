use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use super::finding::{Finding, RiskLevel};

/// Where a domain age estimate came from, in decreasing order of authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgeSource {
    Whois,
    SslCert,
    CertTransparency,
    #[default]
    Unknown,
}

impl AgeSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Whois => "WHOIS",
            Self::SslCert => "SSL Certificate",
            Self::CertTransparency => "Certificate Transparency (crt.sh)",
            Self::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AgeInfo {
    pub days: Option<i64>,
    pub source: AgeSource,
    /// Set when the estimate comes from historical CT log data.
    pub is_historical: bool,
}

impl AgeInfo {
    pub fn unknown() -> Self {
        Self::default()
    }
}

/// Count of tallied findings per risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RiskTally {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
    pub critical: u32,
}

impl RiskTally {
    pub fn record(&mut self, risk: RiskLevel) {
        match risk {
            RiskLevel::Low => self.low += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::High => self.high += 1,
            RiskLevel::Critical => self.critical += 1,
            RiskLevel::NotApplicable => {}
        }
    }

    pub fn total(&self) -> u32 {
        self.low + self.medium + self.high + self.critical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainClassification {
    Safe,
    PotentiallyUnsafe,
    Unsafe,
    Unknown,
    NonExistent,
}

impl DomainClassification {
    pub const ALL: [DomainClassification; 5] = [
        Self::Safe,
        Self::PotentiallyUnsafe,
        Self::Unsafe,
        Self::Unknown,
        Self::NonExistent,
    ];

    pub fn index(&self) -> usize {
        match self {
            Self::Safe => 0,
            Self::PotentiallyUnsafe => 1,
            Self::Unsafe => 2,
            Self::Unknown => 3,
            Self::NonExistent => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::PotentiallyUnsafe => "POTENTIALLY_UNSAFE",
            Self::Unsafe => "UNSAFE",
            Self::Unknown => "UNKNOWN",
            Self::NonExistent => "NON_EXISTENT",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Safe => "Low risk detected in DNS security analysis",
            Self::PotentiallyUnsafe => "Moderate risk detected in DNS security analysis",
            Self::Unsafe => "High risk detected in DNS security analysis",
            Self::Unknown => "Insufficient data to determine safety",
            Self::NonExistent => "Domain does not exist in DNS",
        }
    }
}

/// Aggregate of every finding produced for one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainAssessment {
    pub domain: String,
    pub resolved_ip: Option<String>,
    pub ipv6: BTreeSet<String>,
    pub age_info: AgeInfo,
    pub findings: Vec<Finding>,
    pub risk_tally: RiskTally,
    pub security_score: u32,
    pub classification: DomainClassification,
    #[serde(default)]
    pub dns_latency_ms: Option<f64>,
    #[serde(default)]
    pub mail_providers: BTreeSet<String>,
}

impl DomainAssessment {
    /// Placeholder used when no analysis could be performed at all.
    pub fn unavailable(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            resolved_ip: None,
            ipv6: BTreeSet::new(),
            age_info: AgeInfo::unknown(),
            findings: Vec::new(),
            risk_tally: RiskTally::default(),
            security_score: 0,
            classification: DomainClassification::Unknown,
            dns_latency_ms: None,
            mail_providers: BTreeSet::new(),
        }
    }

    pub fn finding(&self, check: super::finding::CheckKind) -> Option<&Finding> {
        self.findings.iter().find(|f| f.check == check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_ignores_not_applicable() {
        let mut tally = RiskTally::default();
        tally.record(RiskLevel::Medium);
        tally.record(RiskLevel::NotApplicable);
        tally.record(RiskLevel::High);
        assert_eq!(tally.medium, 1);
        assert_eq!(tally.high, 1);
        assert_eq!(tally.total(), 2);
    }

    #[test]
    fn test_classification_indices_are_distinct() {
        let mut seen: Vec<usize> = DomainClassification::ALL.iter().map(|c| c.index()).collect();
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_age_source_serialization() {
        assert_eq!(serde_json::to_string(&AgeSource::CertTransparency).unwrap(), "\"CERT_TRANSPARENCY\"");
        assert_eq!(serde_json::to_string(&AgeSource::SslCert).unwrap(), "\"SSL_CERT\"");
    }
}
