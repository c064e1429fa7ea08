use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::{
    AgeInfo, CheckKind, DomainAssessment, DomainClassification, Finding, Penalty, RiskLevel,
    RiskTally,
};

const PENALTIES: [Penalty; 23] = [
    Penalty::Critical,
    Penalty::SlowDns,
    Penalty::DnsFailure,
    Penalty::NewDomain,
    Penalty::UnknownAge,
    Penalty::UntrustedMx,
    Penalty::MissingSpf,
    Penalty::PermissiveSpf,
    Penalty::MissingDkim,
    Penalty::MissingDmarc,
    Penalty::NoTxtRecords,
    Penalty::NoDnssec,
    Penalty::OutdatedTls,
    Penalty::TlsUnreachable,
    Penalty::TlsFailure,
    Penalty::ReverseDnsMismatch,
    Penalty::MissingHsts,
    Penalty::HttpErrorStatus,
    Penalty::NoHttps,
    Penalty::HttpsInvalid,
    Penalty::Blacklisted,
    Penalty::NoCaa,
    Penalty::ProbeFailed,
];

fn default_points(penalty: Penalty) -> u32 {
    match penalty {
        Penalty::Critical => 50,
        Penalty::SlowDns => 5,
        Penalty::DnsFailure => 20,
        Penalty::NewDomain => 15,
        Penalty::UnknownAge => 10,
        Penalty::UntrustedMx => 10,
        Penalty::MissingSpf => 10,
        Penalty::PermissiveSpf => 20,
        Penalty::MissingDkim => 10,
        Penalty::MissingDmarc => 10,
        Penalty::NoTxtRecords => 30,
        Penalty::NoDnssec => 10,
        Penalty::OutdatedTls => 20,
        Penalty::TlsUnreachable => 10,
        Penalty::TlsFailure => 20,
        Penalty::ReverseDnsMismatch => 10,
        Penalty::MissingHsts => 15,
        Penalty::HttpErrorStatus => 15,
        Penalty::NoHttps => 15,
        Penalty::HttpsInvalid => 25,
        Penalty::Blacklisted => 30,
        Penalty::NoCaa => 10,
        Penalty::ProbeFailed => 0,
    }
}

/// Score deductions and classification thresholds, in one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Points deducted per penalty. Penalties missing from the map use the built-in value.
    pub points: HashMap<Penalty, u32>,
    /// Domains younger than this are flagged as new.
    pub new_domain_days: i64,
    /// DNS resolution slower than this is flagged.
    pub slow_dns_ms: f64,
    /// This many high findings (or any critical) make a domain unsafe.
    pub unsafe_high_count: u32,
    /// More medium findings than this make a domain potentially unsafe.
    pub max_safe_medium: u32,
    /// Scores below this make a domain potentially unsafe.
    pub min_safe_score: u32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            points: PENALTIES.iter().map(|p| (*p, default_points(*p))).collect(),
            new_domain_days: 7,
            slow_dns_ms: 500.0,
            unsafe_high_count: 2,
            max_safe_medium: 6,
            min_safe_score: 25,
        }
    }
}

impl ScoringPolicy {
    pub fn points(&self, penalty: Penalty) -> u32 {
        self.points
            .get(&penalty)
            .copied()
            .unwrap_or_else(|| default_points(penalty))
    }

    /// Classification decision table. First match wins; depends only on tally and score.
    pub fn classify(&self, tally: &RiskTally, score: u32) -> DomainClassification {
        if tally.critical > 0 || tally.high >= self.unsafe_high_count {
            DomainClassification::Unsafe
        } else if tally.high >= 1
            || tally.medium > self.max_safe_medium
            || score < self.min_safe_score
        {
            DomainClassification::PotentiallyUnsafe
        } else if tally.high == 0 && tally.medium <= self.max_safe_medium && score >= self.min_safe_score {
            DomainClassification::Safe
        } else {
            DomainClassification::Unknown
        }
    }
}

/// Accumulates findings into a `DomainAssessment`, deducting as it goes.
pub struct AssessmentBuilder<'a> {
    policy: &'a ScoringPolicy,
    assessment: DomainAssessment,
}

impl<'a> AssessmentBuilder<'a> {
    pub fn new(policy: &'a ScoringPolicy, domain: &str) -> Self {
        let mut assessment = DomainAssessment::unavailable(domain);
        assessment.security_score = 100;
        Self { policy, assessment }
    }

    pub fn push(&mut self, finding: Finding) {
        self.assessment.risk_tally.record(finding.risk);
        for penalty in &finding.penalties {
            let points = self.policy.points(*penalty);
            self.assessment.security_score = self.assessment.security_score.saturating_sub(points);
        }
        self.assessment.findings.push(finding);
    }

    pub fn score(&self) -> u32 {
        self.assessment.security_score
    }

    pub fn set_resolved_ip(&mut self, ip: Option<String>) {
        self.assessment.resolved_ip = ip;
    }

    pub fn set_dns_latency(&mut self, millis: f64) {
        self.assessment.dns_latency_ms = Some(millis);
    }

    pub fn set_age(&mut self, age: AgeInfo) {
        self.assessment.age_info = age;
    }

    pub fn extend_ipv6(&mut self, addresses: impl IntoIterator<Item = String>) {
        self.assessment.ipv6.extend(addresses);
    }

    pub fn extend_mail_providers(&mut self, providers: impl IntoIterator<Item = String>) {
        self.assessment.mail_providers.extend(providers);
    }

    pub fn finish(mut self) -> DomainAssessment {
        self.assessment.security_score = self.assessment.security_score.min(100);
        self.assessment.classification = self
            .policy
            .classify(&self.assessment.risk_tally, self.assessment.security_score);
        self.assessment
    }
}

/// The single-finding assessment for a domain that does not exist.
pub fn non_existent(domain: &str) -> DomainAssessment {
    let finding = Finding::new(CheckKind::DnsResolution, "Non-existent", RiskLevel::NotApplicable)
        .explain("Domain does not exist in DNS.")
        .explain("Possible typo or unregistered domain.")
        .explain("Recommendation: Verify the domain name or contact the domain owner.");

    DomainAssessment {
        domain: domain.to_string(),
        resolved_ip: None,
        ipv6: BTreeSet::new(),
        age_info: AgeInfo::unknown(),
        findings: vec![finding],
        risk_tally: RiskTally::default(),
        security_score: 0,
        classification: DomainClassification::NonExistent,
        dns_latency_ms: None,
        mail_providers: BTreeSet::new(),
    }
}
