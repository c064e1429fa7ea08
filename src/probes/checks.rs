use std::collections::BTreeSet;
use std::net::IpAddr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;

use crate::config::ProbeConfig;
use crate::errors::TrustLensError;
use crate::models::{registrable_domain, AgeInfo, CheckKind, Finding, Penalty, RiskLevel};
use super::age;
use super::backend::{DnsAnswer, HttpOutcome, ProbeBackend, RecordKind, TlsOutcome};
use super::scoring::ScoringPolicy;

/// Everything one assessment's probes share.
pub struct ProbeContext<'a> {
    pub backend: &'a dyn ProbeBackend,
    pub config: &'a ProbeConfig,
    pub policy: &'a ScoringPolicy,
    pub domain: &'a str,
    pub ip: Option<String>,
    pub timeout: Duration,
    pub now: DateTime<Utc>,
    tls: OnceCell<TlsOutcome>,
}

impl<'a> ProbeContext<'a> {
    pub fn new(
        backend: &'a dyn ProbeBackend,
        config: &'a ProbeConfig,
        policy: &'a ScoringPolicy,
        domain: &'a str,
        ip: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            config,
            policy,
            domain,
            ip,
            timeout,
            now: Utc::now(),
            tls: OnceCell::new(),
        }
    }

    /// The TLS handshake result, performed at most once per assessment.
    pub async fn tls(&self) -> &TlsOutcome {
        self.tls
            .get_or_init(|| self.backend.tls_handshake(self.domain))
            .await
    }

    pub fn days_since(&self, then: DateTime<Utc>) -> i64 {
        (self.now - then).num_days()
    }
}

/// What one probe contributes to the assessment.
#[derive(Debug, Default)]
pub struct ProbeReport {
    pub findings: Vec<Finding>,
    pub age: Option<AgeInfo>,
    pub ipv6: Vec<String>,
    pub mail_providers: Vec<String>,
}

impl From<Finding> for ProbeReport {
    fn from(finding: Finding) -> Self {
        Self { findings: vec![finding], ..Default::default() }
    }
}

pub async fn domain_age(ctx: &ProbeContext<'_>) -> Result<ProbeReport, TrustLensError> {
    let age = age::resolve_age(ctx).await;

    let finding = match age.days {
        Some(days) => {
            let is_new = days < ctx.policy.new_domain_days;
            let mut finding = Finding::new(
                CheckKind::DomainAge,
                format!("{} days", days),
                if is_new { RiskLevel::Medium } else { RiskLevel::Low },
            );
            finding = if is_new {
                finding
                    .explain(format!(
                        "New domain (<{} days) - higher phishing risk",
                        ctx.policy.new_domain_days
                    ))
                    .penalize(Penalty::NewDomain)
            } else {
                finding.explain("Established domain - lower inherent risk")
            };
            finding = finding.explain(format!("Source: {}", age.source.label()));
            if age.is_historical {
                finding = finding.explain("Based on historical certificate data");
            }
            finding
        }
        None => Finding::new(CheckKind::DomainAge, "Unknown", RiskLevel::Low)
            .explain("Could not determine registration date")
            .penalize(Penalty::UnknownAge),
    };

    Ok(ProbeReport { findings: vec![finding], age: Some(age), ..Default::default() })
}

fn matches_provider(host: &str, provider: &str) -> bool {
    host == provider || host.ends_with(&format!(".{}", provider))
}

pub async fn mx_records(ctx: &ProbeContext<'_>) -> Result<ProbeReport, TrustLensError> {
    let hosts = match ctx.backend.lookup(ctx.domain, RecordKind::Mx).await? {
        DnsAnswer::Records(hosts) => hosts,
        DnsAnswer::NoAnswer | DnsAnswer::NxDomain => {
            return Ok(Finding::new(CheckKind::MxRecords, "Not found", RiskLevel::Low)
                .explain("No email server configured - reduces phishing risk")
                .into());
        }
    };

    let mut providers = BTreeSet::new();
    let mut unrecognized = Vec::new();
    for host in &hosts {
        let host = host.to_lowercase();
        let matched: Vec<&String> = ctx
            .config
            .trusted_email_providers
            .iter()
            .filter(|(suffix, _)| matches_provider(&host, suffix))
            .map(|(_, name)| name)
            .collect();
        if matched.is_empty() {
            unrecognized.push(host);
        } else {
            providers.extend(matched.into_iter().cloned());
        }
    }

    let mut finding = Finding::new(CheckKind::MxRecords, "Present", RiskLevel::Low);
    for host in &unrecognized {
        finding = finding.explain(format!("Unrecognized MX host: {}", host));
    }
    if !providers.is_empty() {
        let names: Vec<&str> = providers.iter().map(String::as_str).collect();
        finding = finding.explain(format!("Uses trusted email provider(s): {}", names.join(", ")));
    } else if !unrecognized.is_empty() {
        finding.risk = RiskLevel::Medium;
        finding = finding.penalize(Penalty::UntrustedMx);
    }

    Ok(ProbeReport {
        findings: vec![finding],
        mail_providers: providers.into_iter().collect(),
        ..Default::default()
    })
}

fn spf_finding(records: &[String]) -> Finding {
    let Some(spf) = records.iter().find(|r| r.contains("v=spf1")) else {
        return Finding::new(CheckKind::SpfRecord, "Not found", RiskLevel::Medium)
            .explain("No SPF record found - increases spoofing risk")
            .explain("Recommendation: Add an SPF record (e.g., 'v=spf1 include:_spf.google.com ~all')")
            .penalize(Penalty::MissingSpf);
    };

    let finding = Finding::new(CheckKind::SpfRecord, "Present", RiskLevel::Low);
    if spf.contains("+all") {
        let mut finding = finding
            .explain("SPF allows all senders (+all) - permits spoofing")
            .explain("Recommendation: Use stricter policy (e.g., '-all' or '~all')")
            .penalize(Penalty::PermissiveSpf);
        finding.risk = RiskLevel::High;
        finding
    } else if spf.contains("-all") {
        finding.explain("Strict SPF policy (-all) enforced - good security")
    } else {
        finding.explain("SPF found, likely using soft fail (~all) or neutral policy")
    }
}

fn dkim_dmarc_finding(has_dkim: bool, has_dmarc: bool) -> Finding {
    let mut missing = Vec::new();
    let mut finding = Finding::new(CheckKind::DkimDmarc, "Complete", RiskLevel::Low);
    if !has_dkim {
        missing.push("DKIM missing");
        finding = finding
            .explain("DKIM missing - reduces email authenticity")
            .penalize(Penalty::MissingDkim);
    }
    if !has_dmarc {
        missing.push("DMARC missing");
        finding = finding
            .explain("DMARC missing - vulnerable to domain spoofing")
            .penalize(Penalty::MissingDmarc);
    }
    if missing.is_empty() {
        finding.explain("DKIM and DMARC present - strong email security")
    } else {
        finding.status = missing.join(", ");
        finding.risk = RiskLevel::Medium;
        finding
    }
}

/// SPF and DKIM/DMARC findings, or a single "no TXT records" finding.
pub async fn email_security(ctx: &ProbeContext<'_>) -> Result<ProbeReport, TrustLensError> {
    let records = match ctx.backend.lookup(ctx.domain, RecordKind::Txt).await? {
        DnsAnswer::Records(records) => records,
        DnsAnswer::NoAnswer | DnsAnswer::NxDomain => {
            return Ok(Finding::new(CheckKind::EmailSecurity, "No TXT records", RiskLevel::High)
                .explain("Missing all email security records (SPF/DKIM/DMARC)")
                .penalize(Penalty::NoTxtRecords)
                .into());
        }
    };

    let has_dkim = records.iter().any(|r| r.contains("v=DKIM1"));
    let mut has_dmarc = records.iter().any(|r| r.contains("v=DMARC1"));
    if !has_dmarc {
        // DMARC normally lives on the _dmarc label; a failed lookup counts as absent.
        let dmarc_name = format!("_dmarc.{}", ctx.domain);
        if let Ok(answer) = ctx.backend.lookup(&dmarc_name, RecordKind::Txt).await {
            has_dmarc = answer.records().iter().any(|r| r.contains("v=DMARC1"));
        }
    }

    Ok(ProbeReport {
        findings: vec![spf_finding(&records), dkim_dmarc_finding(has_dkim, has_dmarc)],
        ..Default::default()
    })
}

pub async fn dnssec(ctx: &ProbeContext<'_>) -> Result<ProbeReport, TrustLensError> {
    let answer = ctx.backend.lookup(ctx.domain, RecordKind::Dnskey).await?;
    let finding = if answer.is_empty() {
        Finding::new(CheckKind::Dnssec, "Not enabled", RiskLevel::Medium)
            .explain("DNSSEC not configured - vulnerable to DNS spoofing")
            .penalize(Penalty::NoDnssec)
    } else {
        Finding::new(CheckKind::Dnssec, "Enabled", RiskLevel::Low)
            .explain("DNSSEC configured - enhances domain security")
    };
    Ok(finding.into())
}

pub async fn ipv6(ctx: &ProbeContext<'_>) -> Result<ProbeReport, TrustLensError> {
    let addresses = ctx.backend.lookup(ctx.domain, RecordKind::Aaaa).await?.records().to_vec();
    let finding = if addresses.is_empty() {
        Finding::new(CheckKind::Ipv6, "Not found", RiskLevel::Low)
            .explain("No IPv6 (AAAA) records - IPv4 only")
    } else {
        Finding::new(CheckKind::Ipv6, format!("Found: {}", addresses.join(", ")), RiskLevel::Low)
            .explain(format!("IPv6 supported with {} address(es)", addresses.len()))
    };
    Ok(ProbeReport { findings: vec![finding], ipv6: addresses, ..Default::default() })
}

pub async fn tls_version(ctx: &ProbeContext<'_>) -> Result<ProbeReport, TrustLensError> {
    let finding = match ctx.tls().await {
        TlsOutcome::Established(info) => {
            let finding = Finding::new(
                CheckKind::TlsVersion,
                format!("Supported: {}", info.version),
                RiskLevel::Low,
            )
            .explain(format!("TLS version: {}", info.version))
            .explain(format!("Cipher: {}", info.cipher));
            match info.version.as_str() {
                "TLSv1" | "TLSv1.1" => {
                    let mut finding = finding
                        .explain("Outdated TLS version detected - vulnerable to attacks")
                        .explain("Recommendation: Upgrade to TLS 1.2 or 1.3")
                        .penalize(Penalty::OutdatedTls);
                    finding.risk = RiskLevel::High;
                    finding
                }
                "TLSv1.2" => finding.explain("TLS 1.2 is secure but consider upgrading to 1.3"),
                "TLSv1.3" => finding.explain("TLS 1.3 - most secure version"),
                _ => finding,
            }
        }
        TlsOutcome::Unreachable(reason) => {
            Finding::new(CheckKind::TlsVersion, "Unreachable", RiskLevel::Medium)
                .explain("Could not connect to check TLS versions")
                .explain(reason.clone())
                .penalize(Penalty::TlsUnreachable)
        }
        TlsOutcome::Failed(reason) => Finding::new(CheckKind::TlsVersion, "Failed", RiskLevel::High)
            .explain(format!("SSL error: {}", reason))
            .penalize(Penalty::TlsFailure),
    };
    Ok(finding.into())
}

fn ptr_is_consistent(host: &str, ip: &str, domain: &str) -> bool {
    let dashed = ip.replace(['.', ':'], "-");
    host.contains(ip)
        || host.contains(&dashed)
        || registrable_domain(host) == registrable_domain(domain)
}

pub async fn reverse_dns(ctx: &ProbeContext<'_>) -> Result<ProbeReport, TrustLensError> {
    let Some(ip) = ctx.ip.as_deref() else {
        return Ok(Finding::new(CheckKind::ReverseDns, "Not performed", RiskLevel::Low)
            .explain("No IP address to look up")
            .into());
    };
    let addr: IpAddr = ip
        .parse()
        .map_err(|_| TrustLensError::Probe(format!("'{}' is not an IP address", ip)))?;

    let finding = match ctx.backend.reverse(addr).await? {
        DnsAnswer::Records(hosts) if !hosts.is_empty() => {
            let host = &hosts[0];
            let finding = Finding::new(
                CheckKind::ReverseDns,
                format!("Resolved to {}", host),
                RiskLevel::Low,
            );
            if ptr_is_consistent(host, ip, ctx.domain) {
                finding.explain("Reverse DNS matches domain or related host - good consistency")
            } else {
                let mut finding = finding
                    .explain("Reverse DNS does not match domain - potential misconfiguration")
                    .explain("Recommendation: Ensure PTR record aligns with domain")
                    .penalize(Penalty::ReverseDnsMismatch);
                finding.risk = RiskLevel::Medium;
                finding
            }
        }
        _ => Finding::new(CheckKind::ReverseDns, "No PTR record", RiskLevel::Medium)
            .explain("No reverse DNS record - reduces trust")
            .explain("Recommendation: Configure a PTR record")
            .penalize(Penalty::ReverseDnsMismatch),
    };
    Ok(finding.into())
}

pub async fn http_availability(ctx: &ProbeContext<'_>) -> Result<ProbeReport, TrustLensError> {
    let https_url = format!("https://{}/", ctx.domain);

    let finding = match ctx.backend.fetch(&https_url).await {
        HttpOutcome::Response(resp) => {
            let mut finding = Finding::new(
                CheckKind::HttpAvailability,
                format!("HTTPS OK (Status: {})", resp.status),
                RiskLevel::Low,
            );
            if resp.final_url != https_url {
                finding = finding.explain(format!("Redirected to: {}", resp.final_url));
            }
            let error_status = !(200..300).contains(&resp.status);
            if error_status {
                finding.risk = RiskLevel::Medium;
                finding = finding.explain("HTTPS returned non-200 status - potential issue");
            }
            if let TlsOutcome::Established(info) = ctx.tls().await {
                if let Some(issued) = info.not_before {
                    let cert_age = ctx.days_since(issued);
                    finding = finding.explain(format!("Certificate issued {} days ago", cert_age));
                    if cert_age < ctx.policy.new_domain_days {
                        finding = finding.explain("Recently issued certificate - verify site legitimacy");
                    }
                }
            }
            if resp.hsts {
                finding = finding.explain("HSTS enabled - enforces HTTPS usage");
                // A medium HTTP finding costs 15 once, whatever made it medium.
                if error_status {
                    finding = finding.penalize(Penalty::HttpErrorStatus);
                }
                finding
            } else {
                finding.risk = RiskLevel::Medium;
                finding
                    .explain("HSTS not enabled - no strict HTTPS enforcement")
                    .explain("Recommendation: Enable HSTS header")
                    .penalize(Penalty::MissingHsts)
            }
        }
        HttpOutcome::TlsError(reason) => {
            Finding::new(CheckKind::HttpAvailability, "HTTPS Failed", RiskLevel::High)
                .explain("Invalid or missing SSL certificate")
                .explain("Recommendation: Install a valid SSL certificate")
                .explain(reason)
                .penalize(Penalty::HttpsInvalid)
        }
        HttpOutcome::Unreachable(_) => {
            match ctx.backend.fetch(&format!("http://{}/", ctx.domain)).await {
                HttpOutcome::Response(_) => {
                    Finding::new(CheckKind::HttpAvailability, "HTTP Only", RiskLevel::Medium)
                        .explain("No HTTPS support - data not encrypted")
                        .explain("Recommendation: Enable HTTPS with a valid certificate")
                        .penalize(Penalty::NoHttps)
                }
                _ => Finding::new(CheckKind::HttpAvailability, "Unreachable", RiskLevel::Medium)
                    .explain("Domain not reachable via HTTP/HTTPS")
                    .penalize(Penalty::NoHttps),
            }
        }
    };
    Ok(finding.into())
}

/// DNSBL answers in 127.255.255.0/24 are query errors (e.g. refused public resolver), not listings.
fn is_listing(answer: &DnsAnswer) -> bool {
    answer
        .records()
        .iter()
        .any(|addr| addr.starts_with("127.") && !addr.starts_with("127.255.255."))
}

pub async fn blacklist(ctx: &ProbeContext<'_>) -> Result<ProbeReport, TrustLensError> {
    let Some(ip) = ctx.ip.as_deref() else {
        return Ok(Finding::new(CheckKind::Blacklist, "Not checked", RiskLevel::Low)
            .explain("No IP to check against blacklist")
            .into());
    };
    let Ok(IpAddr::V4(v4)) = ip.parse::<IpAddr>() else {
        return Ok(Finding::new(CheckKind::Blacklist, "Not checked", RiskLevel::Low)
            .explain("Blacklist lookup supports IPv4 addresses only")
            .into());
    };

    let octets = v4.octets();
    let reversed = format!("{}.{}.{}.{}", octets[3], octets[2], octets[1], octets[0]);

    let mut listed = Vec::new();
    let mut failures = Vec::new();
    for server in &ctx.config.blacklist_servers {
        match ctx.backend.lookup(&format!("{}.{}", reversed, server), RecordKind::A).await {
            Ok(answer) if is_listing(&answer) => listed.push(server.as_str()),
            Ok(_) => {}
            Err(e) => failures.push(format!("{}: {}", server, e)),
        }
    }

    if listed.is_empty() && !failures.is_empty() && failures.len() == ctx.config.blacklist_servers.len() {
        return Err(TrustLensError::Probe(format!("Blacklist check failed: {}", failures.join("; "))));
    }

    let finding = if listed.is_empty() {
        let mut finding = Finding::new(CheckKind::Blacklist, "Not listed", RiskLevel::Low)
            .explain("IP not found in common blacklists - good reputation");
        for failure in failures {
            finding = finding.explain(format!("Blacklist check failed: {}", failure));
        }
        finding
    } else {
        let (risk, penalty) = if listed.len() >= 2 {
            (RiskLevel::Critical, Penalty::Critical)
        } else {
            (RiskLevel::High, Penalty::Blacklisted)
        };
        let mut finding = Finding::new(CheckKind::Blacklist, "Listed", risk);
        for server in &listed {
            finding = finding.explain(format!("IP listed in {} - potential spam/malware risk", server));
        }
        finding
            .explain("Recommendation: Investigate and delist if legitimate")
            .penalize(penalty)
    };
    Ok(finding.into())
}

pub async fn geoip(ctx: &ProbeContext<'_>) -> Result<ProbeReport, TrustLensError> {
    let Some(ip) = ctx.ip.as_deref() else {
        return Ok(Finding::new(CheckKind::GeoIp, "Not checked", RiskLevel::Low)
            .explain("No IP to perform GeoIP lookup")
            .into());
    };
    let finding = match ctx.backend.geoip(ip).await? {
        Some(geo) => Finding::new(
            CheckKind::GeoIp,
            format!("{}, {} (ISP: {})", geo.city, geo.country, geo.isp),
            RiskLevel::Low,
        )
        .explain(format!("IP located in {} - hosted by {}", geo.country, geo.isp)),
        None => Finding::new(CheckKind::GeoIp, "Not checked", RiskLevel::Low)
            .explain("GeoIP lookup failed - invalid IP data"),
    };
    Ok(finding.into())
}

pub async fn subdomains(ctx: &ProbeContext<'_>) -> Result<ProbeReport, TrustLensError> {
    let names: Vec<String> = ctx
        .config
        .common_subdomains
        .iter()
        .map(|sub| format!("{}.{}", sub, ctx.domain))
        .collect();
    let answers = futures::future::join_all(
        names.iter().map(|name| ctx.backend.lookup(name, RecordKind::A)),
    )
    .await;

    let found: Vec<&str> = names
        .iter()
        .zip(answers)
        .filter(|(_, answer)| matches!(answer, Ok(a) if !a.is_empty()))
        .map(|(name, _)| name.as_str())
        .collect();

    let finding = if found.is_empty() {
        Finding::new(CheckKind::Subdomains, "None found", RiskLevel::Low)
            .explain("No common subdomains detected")
    } else {
        Finding::new(CheckKind::Subdomains, format!("Found: {}", found.join(", ")), RiskLevel::Low)
            .explain(format!("Active subdomains detected: {}", found.len()))
            .explain("Recommendation: Verify these are intentional and secure")
    };
    Ok(finding.into())
}

pub async fn caa(ctx: &ProbeContext<'_>) -> Result<ProbeReport, TrustLensError> {
    let records = ctx.backend.lookup(ctx.domain, RecordKind::Caa).await?.records().to_vec();
    let finding = if records.is_empty() {
        Finding::new(CheckKind::Caa, "Not found", RiskLevel::Medium)
            .explain("No CAA records - unrestricted certificate issuance")
            .explain("Recommendation: Add CAA records (e.g., '0 issue \"letsencrypt.org\"')")
            .penalize(Penalty::NoCaa)
    } else {
        Finding::new(CheckKind::Caa, format!("Found: {} records", records.len()), RiskLevel::Low)
            .explain(format!("CAA records present: {}", records.join(", ")))
            .explain("Ensures only authorized CAs can issue certificates")
    };
    Ok(finding.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_provider() {
        assert!(matches_provider("aspmx.l.google.com", "google.com"));
        assert!(matches_provider("google.com", "google.com"));
        assert!(!matches_provider("notgoogle.com", "google.com"));
    }

    #[test]
    fn test_spf_policies() {
        let missing = spf_finding(&["google-site-verification=abc".to_string()]);
        assert_eq!(missing.risk, RiskLevel::Medium);
        assert_eq!(missing.penalties, vec![Penalty::MissingSpf]);

        let permissive = spf_finding(&["v=spf1 +all".to_string()]);
        assert_eq!(permissive.risk, RiskLevel::High);
        assert_eq!(permissive.penalties, vec![Penalty::PermissiveSpf]);

        let strict = spf_finding(&["v=spf1 include:_spf.example.com -all".to_string()]);
        assert_eq!(strict.risk, RiskLevel::Low);
        assert!(strict.penalties.is_empty());
    }

    #[test]
    fn test_dkim_dmarc_status() {
        let both = dkim_dmarc_finding(false, false);
        assert_eq!(both.status, "DKIM missing, DMARC missing");
        assert_eq!(both.penalties.len(), 2);

        let complete = dkim_dmarc_finding(true, true);
        assert_eq!(complete.status, "Complete");
        assert_eq!(complete.risk, RiskLevel::Low);
    }

    #[test]
    fn test_ptr_consistency() {
        assert!(ptr_is_consistent("mail.example.com", "93.184.216.34", "example.com"));
        assert!(ptr_is_consistent("93-184-216-34.host.net", "93.184.216.34", "example.com"));
        assert!(!ptr_is_consistent("server.other.net", "93.184.216.34", "example.com"));
    }

    #[test]
    fn test_dnsbl_error_codes_are_not_listings() {
        assert!(is_listing(&DnsAnswer::Records(vec!["127.0.0.2".into()])));
        assert!(!is_listing(&DnsAnswer::Records(vec!["127.255.255.254".into()])));
        assert!(!is_listing(&DnsAnswer::NxDomain));
    }
}
