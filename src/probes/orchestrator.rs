use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::{join_all, BoxFuture, FutureExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ProbeConfig;
use crate::errors::TrustLensError;
use crate::models::{CheckKind, DomainAssessment, Finding, Penalty, RiskLevel};
use super::backend::{DnsAnswer, ProbeBackend, RecordKind};
use super::checks::{self, ProbeContext, ProbeReport};
use super::scoring::{non_existent, AssessmentBuilder, ScoringPolicy};

/// Produces a `DomainAssessment` for a domain. Never fails: problems become findings.
#[async_trait]
pub trait DomainAssessor: Send + Sync {
    /// Assess `domain`, giving up with an unavailable assessment once `cancel` fires.
    async fn assess_domain(&self, domain: &str, cancel: &CancellationToken) -> DomainAssessment;
}

enum Existence {
    Resolved(Option<String>),
    Missing,
}

type Probe<'a> = (CheckKind, BoxFuture<'a, Result<ProbeReport, TrustLensError>>);

/// Runs the probe battery for one domain and scores the result.
pub struct ProbeOrchestrator {
    backend: Arc<dyn ProbeBackend>,
    config: ProbeConfig,
    policy: ScoringPolicy,
}

impl ProbeOrchestrator {
    pub fn new(backend: Arc<dyn ProbeBackend>, config: ProbeConfig, policy: ScoringPolicy) -> Self {
        Self { backend, config, policy }
    }

    /// Run every probe against `domain`, each bounded by `timeout`.
    pub async fn assess(&self, domain: &str, timeout: Duration) -> DomainAssessment {
        let mut builder = AssessmentBuilder::new(&self.policy, domain);

        let ip = match self.resolve(domain, timeout, &mut builder).await {
            Existence::Resolved(ip) => ip,
            Existence::Missing => {
                info!(domain = %domain, "Domain does not exist, skipping remaining probes");
                return non_existent(domain);
            }
        };
        builder.set_resolved_ip(ip.clone());

        let ctx = ProbeContext::new(
            self.backend.as_ref(),
            &self.config,
            &self.policy,
            domain,
            ip,
            timeout,
        );

        let battery: Vec<Probe<'_>> = vec![
            (CheckKind::DomainAge, checks::domain_age(&ctx).boxed()),
            (CheckKind::MxRecords, checks::mx_records(&ctx).boxed()),
            (CheckKind::EmailSecurity, checks::email_security(&ctx).boxed()),
            (CheckKind::Dnssec, checks::dnssec(&ctx).boxed()),
            (CheckKind::Ipv6, checks::ipv6(&ctx).boxed()),
            (CheckKind::TlsVersion, checks::tls_version(&ctx).boxed()),
            (CheckKind::ReverseDns, checks::reverse_dns(&ctx).boxed()),
            (CheckKind::HttpAvailability, checks::http_availability(&ctx).boxed()),
            (CheckKind::Blacklist, checks::blacklist(&ctx).boxed()),
            (CheckKind::GeoIp, checks::geoip(&ctx).boxed()),
            (CheckKind::Subdomains, checks::subdomains(&ctx).boxed()),
            (CheckKind::Caa, checks::caa(&ctx).boxed()),
        ];

        let semaphore = Semaphore::new(self.config.concurrency.max(1));
        let runs = battery.into_iter().map(|(check, probe)| {
            let semaphore = &semaphore;
            async move {
                let _permit = semaphore.acquire().await.ok();
                match tokio::time::timeout(timeout, probe).await {
                    Ok(Ok(report)) => report,
                    Ok(Err(e)) => {
                        warn!(domain = %domain, check = %check, error = %e, "Probe failed");
                        ProbeReport::from(Finding::could_not_check(check, e))
                    }
                    Err(_) => {
                        warn!(domain = %domain, check = %check, timeout_ms = timeout.as_millis() as u64, "Probe timed out");
                        ProbeReport::from(Finding::could_not_check(
                            check,
                            format!("timed out after {} ms", timeout.as_millis()),
                        ))
                    }
                }
            }
        });

        for report in join_all(runs).await {
            for finding in report.findings {
                builder.push(finding);
            }
            if let Some(age) = report.age {
                builder.set_age(age);
            }
            builder.extend_ipv6(report.ipv6);
            builder.extend_mail_providers(report.mail_providers);
        }

        let assessment = builder.finish();
        info!(
            domain = %domain,
            score = assessment.security_score,
            classification = ?assessment.classification,
            findings = assessment.findings.len(),
            "Domain assessment completed"
        );
        assessment
    }

    async fn resolve(
        &self,
        domain: &str,
        timeout: Duration,
        builder: &mut AssessmentBuilder<'_>,
    ) -> Existence {
        if domain.parse::<IpAddr>().is_ok() {
            builder.push(
                Finding::new(CheckKind::DnsResolution, "Exists", RiskLevel::Low)
                    .explain(format!("Host is an IP address literal: {}", domain)),
            );
            return Existence::Resolved(Some(domain.to_string()));
        }

        let started = Instant::now();
        let primary = tokio::time::timeout(timeout, self.backend.lookup(domain, RecordKind::A)).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let failure = match primary {
            Ok(Ok(DnsAnswer::Records(ips))) if !ips.is_empty() => {
                let ip = ips[0].clone();
                builder.set_dns_latency(latency_ms);
                let mut finding = Finding::new(CheckKind::DnsResolution, "Exists", RiskLevel::Low)
                    .explain(format!("Domain resolved to {}", ip))
                    .explain(format!("DNS response time: {:.2} ms", latency_ms));
                if latency_ms > self.policy.slow_dns_ms {
                    finding.risk = RiskLevel::Medium;
                    finding = finding
                        .explain("Slow DNS response - potential performance issue")
                        .penalize(Penalty::SlowDns);
                }
                builder.push(finding);
                return Existence::Resolved(Some(ip));
            }
            Ok(Ok(DnsAnswer::NxDomain)) => "domain name not found".to_string(),
            Ok(Ok(_)) => "no address records returned".to_string(),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {} ms", timeout.as_millis()),
        };

        warn!(domain = %domain, reason = %failure, "DNS resolution failed, checking existence");

        let existence_error = match tokio::time::timeout(timeout, self.backend.lookup_public(domain)).await {
            Ok(Ok(answer)) if answer.is_empty() => return Existence::Missing,
            Ok(Ok(_)) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some("existence check timed out".to_string()),
        };

        let mut finding = Finding::new(CheckKind::DnsResolution, "Failed", RiskLevel::Medium)
            .explain(format!("DNS resolution failed: {}", failure))
            .explain("Possible temporary DNS issue")
            .penalize(Penalty::DnsFailure);
        if let Some(reason) = existence_error {
            warn!(domain = %domain, error = %reason, "Existence check failed, treating domain as existing");
            finding = finding.explain(format!("Existence check failed: {}", reason));
        }
        builder.push(finding);
        Existence::Resolved(None)
    }
}

#[async_trait]
impl DomainAssessor for ProbeOrchestrator {
    async fn assess_domain(&self, domain: &str, cancel: &CancellationToken) -> DomainAssessment {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(domain = %domain, "Domain assessment cancelled");
                DomainAssessment::unavailable(domain)
            }
            assessment = self.assess(domain, self.config.timeout()) => assessment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{DateTime, TimeZone, Utc};

    use crate::models::{AgeSource, DomainClassification};
    use crate::probes::backend::{GeoInfo, HttpOutcome, HttpResponse, TlsInfo, TlsOutcome};

    struct FakeBackend {
        records: HashMap<(String, RecordKind), DnsAnswer>,
        primary_fails: bool,
        public: DnsAnswer,
        ptr: DnsAnswer,
        tls: TlsOutcome,
        https: HttpOutcome,
        http: HttpOutcome,
        whois: Vec<DateTime<Utc>>,
        geoip_delay: Duration,
        age_delay: Duration,
        calls: AtomicUsize,
    }

    impl FakeBackend {
        fn bare() -> Self {
            Self {
                records: HashMap::new(),
                primary_fails: false,
                public: DnsAnswer::NxDomain,
                ptr: DnsAnswer::NoAnswer,
                tls: TlsOutcome::Unreachable("connection refused".into()),
                https: HttpOutcome::Unreachable("connection refused".into()),
                http: HttpOutcome::Unreachable("connection refused".into()),
                whois: vec![],
                geoip_delay: Duration::ZERO,
                age_delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn with(mut self, name: &str, kind: RecordKind, records: &[&str]) -> Self {
            self.records.insert(
                (name.to_string(), kind),
                DnsAnswer::Records(records.iter().map(|r| r.to_string()).collect()),
            );
            self
        }

        fn well_configured() -> Self {
            let mut backend = Self::bare()
                .with("example.com", RecordKind::A, &["93.184.216.34"])
                .with("example.com", RecordKind::Mx, &["aspmx.l.google.com"])
                .with(
                    "example.com",
                    RecordKind::Txt,
                    &["v=spf1 include:_spf.google.com -all", "v=DKIM1; k=rsa", "v=DMARC1; p=reject"],
                )
                .with("example.com", RecordKind::Dnskey, &["257 3 13 abc"])
                .with("example.com", RecordKind::Aaaa, &["2606:2800:220:1::1"])
                .with("example.com", RecordKind::Caa, &["0 issue \"letsencrypt.org\""]);
            backend.ptr = DnsAnswer::Records(vec!["www.example.com".into()]);
            backend.tls = TlsOutcome::Established(TlsInfo {
                version: "TLSv1.3".into(),
                cipher: "TLS13_AES_256_GCM_SHA384".into(),
                not_before: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
            });
            backend.https = HttpOutcome::Response(HttpResponse {
                status: 200,
                final_url: "https://example.com/".into(),
                hsts: true,
            });
            backend.whois = vec![
                Utc.with_ymd_and_hms(1995, 8, 14, 4, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(1992, 1, 1, 0, 0, 0).unwrap(),
            ];
            backend
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProbeBackend for FakeBackend {
        async fn lookup(&self, name: &str, kind: RecordKind) -> Result<DnsAnswer, TrustLensError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if kind == RecordKind::A && self.primary_fails && !name.contains("spamhaus") {
                return Err(TrustLensError::Resolution("SERVFAIL".into()));
            }
            Ok(self
                .records
                .get(&(name.to_string(), kind))
                .cloned()
                .unwrap_or(DnsAnswer::NoAnswer))
        }

        async fn lookup_public(&self, _name: &str) -> Result<DnsAnswer, TrustLensError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.public.clone())
        }

        async fn reverse(&self, _ip: IpAddr) -> Result<DnsAnswer, TrustLensError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.ptr.clone())
        }

        async fn tls_handshake(&self, _domain: &str) -> TlsOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.age_delay).await;
            self.tls.clone()
        }

        async fn fetch(&self, url: &str) -> HttpOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.starts_with("https://") {
                self.https.clone()
            } else {
                self.http.clone()
            }
        }

        async fn geoip(&self, _ip: &str) -> Result<Option<GeoInfo>, TrustLensError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.geoip_delay).await;
            Ok(Some(GeoInfo {
                country: "United States".into(),
                city: "Norwell".into(),
                isp: "Edgecast".into(),
            }))
        }

        async fn whois_creation_dates(&self, _domain: &str) -> Result<Vec<DateTime<Utc>>, TrustLensError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.age_delay).await;
            Ok(self.whois.clone())
        }

        async fn ct_entry_dates(&self, _domain: &str) -> Result<Vec<DateTime<Utc>>, TrustLensError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.age_delay).await;
            Ok(vec![])
        }
    }

    fn orchestrator(backend: Arc<FakeBackend>) -> ProbeOrchestrator {
        ProbeOrchestrator::new(backend, ProbeConfig::default(), ScoringPolicy::default())
    }

    #[tokio::test]
    async fn test_non_existent_domain_short_circuits() {
        let backend = Arc::new(FakeBackend::bare());
        let assessment = orchestrator(backend.clone())
            .assess("no-such-domain.example", Duration::from_secs(2))
            .await;

        assert_eq!(assessment.findings.len(), 1);
        assert_eq!(assessment.findings[0].risk, RiskLevel::NotApplicable);
        assert_eq!(assessment.security_score, 0);
        assert_eq!(assessment.classification, DomainClassification::NonExistent);
        // Primary lookup plus the existence check; no other probe ran.
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_unresolvable_but_existing_domain_continues() {
        let mut fake = FakeBackend::well_configured();
        fake.primary_fails = true;
        fake.public = DnsAnswer::Records(vec!["93.184.216.34".into()]);
        let assessment = orchestrator(Arc::new(fake))
            .assess("example.com", Duration::from_secs(2))
            .await;

        let dns = &assessment.findings[0];
        assert_eq!(dns.check, CheckKind::DnsResolution);
        assert_eq!(dns.status, "Failed");
        assert_eq!(dns.risk, RiskLevel::Medium);
        assert!(assessment.findings.len() > 1);
        assert!(assessment.resolved_ip.is_none());
        assert_ne!(assessment.classification, DomainClassification::NonExistent);
    }

    #[tokio::test]
    async fn test_failed_existence_check_treated_as_existing() {
        struct FailingPublic(FakeBackend);

        #[async_trait]
        impl ProbeBackend for FailingPublic {
            async fn lookup(&self, name: &str, kind: RecordKind) -> Result<DnsAnswer, TrustLensError> {
                self.0.lookup(name, kind).await
            }
            async fn lookup_public(&self, _name: &str) -> Result<DnsAnswer, TrustLensError> {
                Err(TrustLensError::Resolution("no nameservers reachable".into()))
            }
            async fn reverse(&self, ip: IpAddr) -> Result<DnsAnswer, TrustLensError> {
                self.0.reverse(ip).await
            }
            async fn tls_handshake(&self, domain: &str) -> TlsOutcome {
                self.0.tls_handshake(domain).await
            }
            async fn fetch(&self, url: &str) -> HttpOutcome {
                self.0.fetch(url).await
            }
            async fn geoip(&self, ip: &str) -> Result<Option<GeoInfo>, TrustLensError> {
                self.0.geoip(ip).await
            }
            async fn whois_creation_dates(&self, d: &str) -> Result<Vec<DateTime<Utc>>, TrustLensError> {
                self.0.whois_creation_dates(d).await
            }
            async fn ct_entry_dates(&self, d: &str) -> Result<Vec<DateTime<Utc>>, TrustLensError> {
                self.0.ct_entry_dates(d).await
            }
        }

        let orchestrator = ProbeOrchestrator::new(
            Arc::new(FailingPublic(FakeBackend::bare())),
            ProbeConfig::default(),
            ScoringPolicy::default(),
        );
        let assessment = orchestrator.assess("flaky.example", Duration::from_secs(2)).await;
        assert_eq!(assessment.findings[0].status, "Failed");
        assert!(assessment.findings[0]
            .explanations
            .iter()
            .any(|e| e.starts_with("Existence check failed")));
        assert_ne!(assessment.classification, DomainClassification::NonExistent);
    }

    #[tokio::test]
    async fn test_well_configured_domain_is_safe() {
        let assessment = orchestrator(Arc::new(FakeBackend::well_configured()))
            .assess("example.com", Duration::from_secs(2))
            .await;

        let order: Vec<CheckKind> = assessment.findings.iter().map(|f| f.check).collect();
        assert_eq!(
            order,
            vec![
                CheckKind::DnsResolution,
                CheckKind::DomainAge,
                CheckKind::MxRecords,
                CheckKind::SpfRecord,
                CheckKind::DkimDmarc,
                CheckKind::Dnssec,
                CheckKind::Ipv6,
                CheckKind::TlsVersion,
                CheckKind::ReverseDns,
                CheckKind::HttpAvailability,
                CheckKind::Blacklist,
                CheckKind::GeoIp,
                CheckKind::Subdomains,
                CheckKind::Caa,
            ]
        );
        assert_eq!(assessment.security_score, 100);
        assert_eq!(assessment.risk_tally.medium + assessment.risk_tally.high, 0);
        assert_eq!(assessment.classification, DomainClassification::Safe);
        assert_eq!(assessment.resolved_ip.as_deref(), Some("93.184.216.34"));
        assert!(assessment.ipv6.contains("2606:2800:220:1::1"));
        assert!(assessment.mail_providers.contains("Google Mail"));
        assert_eq!(assessment.age_info.source, AgeSource::Whois);
        assert!(assessment.age_info.days.unwrap() > 365 * 30);
    }

    #[tokio::test]
    async fn test_bare_domain_scores_low() {
        let backend = FakeBackend::bare().with("bare.example", RecordKind::A, &["198.51.100.7"]);
        let assessment = orchestrator(Arc::new(backend))
            .assess("bare.example", Duration::from_secs(2))
            .await;

        let email = assessment.finding(CheckKind::EmailSecurity).unwrap();
        assert_eq!(email.status, "No TXT records");
        assert!(assessment.finding(CheckKind::SpfRecord).is_none());
        assert_eq!(assessment.age_info.source, AgeSource::Unknown);
        // unknown age 10, no TXT 30, no DNSSEC 10, TLS unreachable 10, no PTR 10, no HTTPS 15, no CAA 10
        assert_eq!(assessment.security_score, 5);
        assert_eq!(assessment.risk_tally.high, 1);
        assert_eq!(assessment.classification, DomainClassification::PotentiallyUnsafe);
    }

    #[tokio::test]
    async fn test_age_falls_back_to_certificate() {
        let mut backend = FakeBackend::well_configured();
        backend.whois = vec![];
        let assessment = orchestrator(Arc::new(backend))
            .assess("example.com", Duration::from_secs(2))
            .await;
        assert_eq!(assessment.age_info.source, AgeSource::SslCert);
        assert!(!assessment.age_info.is_historical);
    }

    #[tokio::test]
    async fn test_slow_probe_degrades_to_could_not_check() {
        let mut backend = FakeBackend::well_configured();
        backend.geoip_delay = Duration::from_secs(5);
        let assessment = orchestrator(Arc::new(backend))
            .assess("example.com", Duration::from_millis(200))
            .await;

        let geo = assessment.finding(CheckKind::GeoIp).unwrap();
        assert_eq!(geo.status, "Could not check");
        assert_eq!(geo.risk, RiskLevel::Medium);
        // The other probes were unaffected.
        assert_eq!(assessment.finding(CheckKind::Caa).unwrap().status, "Found: 1 records");
    }

    #[tokio::test]
    async fn test_slow_age_sources_yield_unknown_age() {
        let mut backend = FakeBackend::well_configured();
        backend.age_delay = Duration::from_secs(5);
        let assessment = orchestrator(Arc::new(backend))
            .assess("example.com", Duration::from_millis(200))
            .await;

        let age = assessment.finding(CheckKind::DomainAge).unwrap();
        assert_eq!(age.status, "Unknown");
        assert_eq!(age.risk, RiskLevel::Low);
        assert_eq!(age.penalties, vec![Penalty::UnknownAge]);
        assert_eq!(assessment.age_info.days, None);
        assert_eq!(assessment.age_info.source, AgeSource::Unknown);
    }

    #[tokio::test]
    async fn test_ip_on_two_blacklists_is_critical() {
        let mut backend = FakeBackend::well_configured();
        for server in ["zen.spamhaus.org", "bl.spamcop.net"] {
            backend = backend.with(&format!("34.216.184.93.{}", server), RecordKind::A, &["127.0.0.2"]);
        }
        let config = ProbeConfig {
            blacklist_servers: vec!["zen.spamhaus.org".into(), "bl.spamcop.net".into()],
            ..ProbeConfig::default()
        };
        let assessment = ProbeOrchestrator::new(Arc::new(backend), config, ScoringPolicy::default())
            .assess("example.com", Duration::from_secs(2))
            .await;

        let blacklist = assessment.finding(CheckKind::Blacklist).unwrap();
        assert_eq!(blacklist.status, "Listed");
        assert_eq!(blacklist.risk, RiskLevel::Critical);
        assert_eq!(blacklist.penalties, vec![Penalty::Critical]);
        assert_eq!(assessment.risk_tally.critical, 1);
        assert_eq!(assessment.security_score, 50);
        assert_eq!(assessment.classification, DomainClassification::Unsafe);
    }

    #[tokio::test]
    async fn test_single_blacklist_listing_is_high() {
        let backend = FakeBackend::well_configured()
            .with("34.216.184.93.zen.spamhaus.org", RecordKind::A, &["127.0.0.4"]);
        let assessment = orchestrator(Arc::new(backend))
            .assess("example.com", Duration::from_secs(2))
            .await;

        let blacklist = assessment.finding(CheckKind::Blacklist).unwrap();
        assert_eq!(blacklist.risk, RiskLevel::High);
        assert_eq!(assessment.security_score, 70);
        assert_eq!(assessment.classification, DomainClassification::PotentiallyUnsafe);
    }

    #[tokio::test]
    async fn test_permissive_spf_is_potentially_unsafe() {
        let mut backend = FakeBackend::well_configured();
        backend.records.insert(
            ("example.com".into(), RecordKind::Txt),
            DnsAnswer::Records(vec!["v=spf1 +all".into(), "v=DKIM1; k=rsa".into(), "v=DMARC1; p=none".into()]),
        );
        let assessment = orchestrator(Arc::new(backend))
            .assess("example.com", Duration::from_secs(2))
            .await;

        let spf = assessment.finding(CheckKind::SpfRecord).unwrap();
        assert_eq!(spf.risk, RiskLevel::High);
        assert_eq!(spf.penalties, vec![Penalty::PermissiveSpf]);
        assert_eq!(assessment.security_score, 80);
        assert_eq!(assessment.classification, DomainClassification::PotentiallyUnsafe);
    }

    #[tokio::test]
    async fn test_deductions_past_zero_clamp_to_zero() {
        let backend = FakeBackend::bare()
            .with("bare.example", RecordKind::A, &["198.51.100.7"])
            .with("bare.example", RecordKind::Txt, &["v=spf1 +all"]);
        let assessment = orchestrator(Arc::new(backend))
            .assess("bare.example", Duration::from_secs(2))
            .await;

        // unknown age 10, +all 20, DKIM 10, DMARC 10, DNSSEC 10, TLS 10, PTR 10, HTTPS 15, CAA 10
        assert_eq!(assessment.security_score, 0);
        assert_eq!(assessment.risk_tally.high, 1);
        assert_eq!(assessment.classification, DomainClassification::PotentiallyUnsafe);
    }

    #[tokio::test]
    async fn test_low_score_alone_is_potentially_unsafe() {
        let backend = FakeBackend::bare()
            .with("bare.example", RecordKind::A, &["198.51.100.7"])
            .with("bare.example", RecordKind::Txt, &["v=spf1 ~all"]);
        let assessment = orchestrator(Arc::new(backend))
            .assess("bare.example", Duration::from_secs(2))
            .await;

        // unknown age 10, DKIM 10, DMARC 10, DNSSEC 10, TLS 10, PTR 10, HTTPS 15, CAA 10
        assert_eq!(assessment.security_score, 15);
        assert_eq!(assessment.risk_tally.high + assessment.risk_tally.critical, 0);
        assert!(assessment.risk_tally.medium <= ScoringPolicy::default().max_safe_medium);
        assert_eq!(assessment.classification, DomainClassification::PotentiallyUnsafe);
    }

    #[tokio::test]
    async fn test_https_error_status_costs_one_deduction() {
        fn serving_503(hsts: bool) -> FakeBackend {
            let mut backend = FakeBackend::well_configured();
            backend.https = HttpOutcome::Response(HttpResponse {
                status: 503,
                final_url: "https://example.com/".into(),
                hsts,
            });
            backend
        }

        let assessment = orchestrator(Arc::new(serving_503(true)))
            .assess("example.com", Duration::from_secs(2))
            .await;
        let http = assessment.finding(CheckKind::HttpAvailability).unwrap();
        assert_eq!(http.risk, RiskLevel::Medium);
        assert_eq!(http.penalties, vec![Penalty::HttpErrorStatus]);
        assert_eq!(assessment.security_score, 85);

        let assessment = orchestrator(Arc::new(serving_503(false)))
            .assess("example.com", Duration::from_secs(2))
            .await;
        let http = assessment.finding(CheckKind::HttpAvailability).unwrap();
        assert_eq!(http.penalties, vec![Penalty::MissingHsts]);
        assert_eq!(assessment.security_score, 85);
    }

    #[tokio::test]
    async fn test_cancelled_assessment_is_unavailable() {
        let orchestrator = orchestrator(Arc::new(FakeBackend::well_configured()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let assessment = orchestrator.assess_domain("example.com", &cancel).await;
        assert!(assessment.findings.is_empty());
        assert_eq!(assessment.classification, DomainClassification::Unknown);
    }
}
