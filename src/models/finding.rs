use serde::{Deserialize, Serialize};

/// Risk tier attached to a single finding, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
    /// Only used for the non-existence finding; never tallied.
    #[serde(rename = "n/a")]
    NotApplicable,
}

impl RiskLevel {
    /// Returns true if this tier participates in the risk tally.
    pub fn is_tallied(&self) -> bool {
        !matches!(self, RiskLevel::NotApplicable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
            RiskLevel::NotApplicable => "n/a",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The probe that produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    DnsResolution,
    DomainAge,
    MxRecords,
    SpfRecord,
    DkimDmarc,
    /// Emitted instead of SPF/DKIM/DMARC when the domain has no TXT records at all.
    EmailSecurity,
    Dnssec,
    Ipv6,
    TlsVersion,
    ReverseDns,
    HttpAvailability,
    Blacklist,
    GeoIp,
    Subdomains,
    Caa,
}

impl CheckKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DnsResolution => "DNS Resolution",
            Self::DomainAge => "Domain Age",
            Self::MxRecords => "MX Records",
            Self::SpfRecord => "SPF Record",
            Self::DkimDmarc => "DKIM/DMARC",
            Self::EmailSecurity => "Email Security",
            Self::Dnssec => "DNSSEC",
            Self::Ipv6 => "IPv6 Support",
            Self::TlsVersion => "TLS Versions",
            Self::ReverseDns => "Reverse DNS",
            Self::HttpAvailability => "HTTP/HTTPS Availability",
            Self::Blacklist => "Blacklist Status",
            Self::GeoIp => "GeoIP Location",
            Self::Subdomains => "Subdomain Enumeration",
            Self::Caa => "CAA Records",
        }
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A named score deduction. Point values live in `ScoringPolicy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Penalty {
    Critical,
    SlowDns,
    DnsFailure,
    NewDomain,
    UnknownAge,
    UntrustedMx,
    MissingSpf,
    PermissiveSpf,
    MissingDkim,
    MissingDmarc,
    NoTxtRecords,
    NoDnssec,
    OutdatedTls,
    TlsUnreachable,
    TlsFailure,
    ReverseDnsMismatch,
    MissingHsts,
    HttpErrorStatus,
    NoHttps,
    HttpsInvalid,
    Blacklisted,
    NoCaa,
    ProbeFailed,
}

/// Normalized result of one probe. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub check: CheckKind,
    pub status: String,
    pub risk: RiskLevel,
    pub explanations: Vec<String>,
    /// Score deductions this finding incurred.
    #[serde(default)]
    pub penalties: Vec<Penalty>,
}

impl Finding {
    pub fn new(check: CheckKind, status: impl Into<String>, risk: RiskLevel) -> Self {
        Self {
            check,
            status: status.into(),
            risk,
            explanations: Vec::new(),
            penalties: Vec::new(),
        }
    }

    pub fn explain(mut self, line: impl Into<String>) -> Self {
        self.explanations.push(line.into());
        self
    }

    pub fn penalize(mut self, penalty: Penalty) -> Self {
        self.penalties.push(penalty);
        self
    }

    /// Degraded finding for a probe that errored or timed out.
    pub fn could_not_check(check: CheckKind, reason: impl std::fmt::Display) -> Self {
        Finding::new(check, "Could not check", RiskLevel::Medium)
            .explain(format!("{} check could not be completed: {}", check, reason))
            .penalize(Penalty::ProbeFailed)
    }
}
