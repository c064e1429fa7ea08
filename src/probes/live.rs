use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::{Name, RData, RecordType};
use hickory_resolver::TokioAsyncResolver;
use reqwest::Client;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ProtocolVersion, RootCertStore};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use crate::config::ProbeConfig;
use crate::errors::TrustLensError;
use super::backend::{
    DnsAnswer, GeoInfo, HttpOutcome, HttpResponse, ProbeBackend, RecordKind, TlsInfo, TlsOutcome,
};
use super::whois;

const DNSKEY_TYPE: u16 = 48;

/// Probe backend that talks to the real network.
pub struct LiveBackend {
    system: TokioAsyncResolver,
    public: TokioAsyncResolver,
    http: Client,
    tls: Arc<ClientConfig>,
    timeout: Duration,
    geoip_url: String,
    ct_log_url: String,
    whois_referral_server: String,
}

impl LiveBackend {
    pub fn new(config: &ProbeConfig) -> Result<Self, TrustLensError> {
        let timeout = config.timeout();
        let public_ip: IpAddr = config.public_resolver.parse().map_err(|_| {
            TrustLensError::Config(format!(
                "probes.public_resolver '{}' is not an IP address",
                config.public_resolver
            ))
        })?;

        let system = match hickory_resolver::system_conf::read_system_conf() {
            Ok((resolver_config, mut opts)) => {
                opts.timeout = timeout;
                TokioAsyncResolver::tokio(resolver_config, opts)
            }
            Err(e) => {
                warn!(error = %e, "System resolver configuration unavailable, using defaults");
                TokioAsyncResolver::tokio(ResolverConfig::default(), resolver_opts(timeout))
            }
        };

        let public = TokioAsyncResolver::tokio(
            ResolverConfig::from_parts(
                None,
                vec![],
                NameServerConfigGroup::from_ips_clear(&[public_ip], 53, true),
            ),
            resolver_opts(timeout),
        );

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| TrustLensError::Internal(format!("HTTP client: {}", e)))?;

        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls = ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .map_err(|e| TrustLensError::Internal(format!("TLS configuration: {}", e)))?
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(Self {
            system,
            public,
            http,
            tls: Arc::new(tls),
            timeout,
            geoip_url: config.geoip_url.trim_end_matches('/').to_string(),
            ct_log_url: config.ct_log_url.trim_end_matches('/').to_string(),
            whois_referral_server: config.whois_referral_server.clone(),
        })
    }

    async fn query(
        resolver: &TokioAsyncResolver,
        name: Name,
        record_type: RecordType,
    ) -> Result<DnsAnswer, TrustLensError> {
        match resolver.lookup(name, record_type).await {
            Ok(lookup) => {
                let records: Vec<String> = lookup.iter().map(rdata_text).collect();
                if records.is_empty() {
                    Ok(DnsAnswer::NoAnswer)
                } else {
                    Ok(DnsAnswer::Records(records))
                }
            }
            Err(e) => classify_resolve_error(e),
        }
    }
}

/// Fully-qualified name, so search domains are never appended.
fn absolute_name(name: &str) -> Result<Name, TrustLensError> {
    Name::from_utf8(format!("{}.", name.trim_end_matches('.')))
        .map_err(|e| TrustLensError::Resolution(format!("Invalid DNS name '{}': {}", name, e)))
}

fn resolver_opts(timeout: Duration) -> ResolverOpts {
    let mut opts = ResolverOpts::default();
    opts.timeout = timeout;
    opts.attempts = 2;
    opts
}

fn record_type(kind: RecordKind) -> RecordType {
    match kind {
        RecordKind::A => RecordType::A,
        RecordKind::Aaaa => RecordType::AAAA,
        RecordKind::Mx => RecordType::MX,
        RecordKind::Txt => RecordType::TXT,
        RecordKind::Dnskey => RecordType::from(DNSKEY_TYPE),
        RecordKind::Caa => RecordType::CAA,
    }
}

fn rdata_text(rdata: &RData) -> String {
    match rdata {
        RData::MX(mx) => mx.exchange().to_utf8().trim_end_matches('.').to_lowercase(),
        RData::TXT(txt) => txt
            .iter()
            .map(|part| String::from_utf8_lossy(part).into_owned())
            .collect::<Vec<_>>()
            .join(""),
        RData::PTR(ptr) => ptr.0.to_utf8().trim_end_matches('.').to_lowercase(),
        other => other.to_string(),
    }
}

fn classify_resolve_error(e: ResolveError) -> Result<DnsAnswer, TrustLensError> {
    match e.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => {
            if *response_code == ResponseCode::NXDomain {
                Ok(DnsAnswer::NxDomain)
            } else {
                Ok(DnsAnswer::NoAnswer)
            }
        }
        ResolveErrorKind::Timeout => Err(TrustLensError::Timeout(e.to_string())),
        _ => Err(TrustLensError::Resolution(e.to_string())),
    }
}

fn protocol_name(version: ProtocolVersion) -> String {
    match version {
        ProtocolVersion::TLSv1_0 => "TLSv1".to_string(),
        ProtocolVersion::TLSv1_1 => "TLSv1.1".to_string(),
        ProtocolVersion::TLSv1_2 => "TLSv1.2".to_string(),
        ProtocolVersion::TLSv1_3 => "TLSv1.3".to_string(),
        other => format!("{:?}", other),
    }
}

fn is_tls_error(err: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<rustls::Error>() {
            return true;
        }
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.get_ref().map(|inner| inner.is::<rustls::Error>()).unwrap_or(false) {
                return true;
            }
        }
        source = e.source();
    }
    false
}

#[derive(Debug, Deserialize)]
struct GeoIpResponse {
    status: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    isp: String,
}

#[derive(Debug, Deserialize)]
struct CtEntry {
    entry_timestamp: Option<String>,
}

fn parse_ct_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}

#[async_trait]
impl ProbeBackend for LiveBackend {
    async fn lookup(&self, name: &str, kind: RecordKind) -> Result<DnsAnswer, TrustLensError> {
        let fqdn = absolute_name(name)?;
        Self::query(&self.system, fqdn, record_type(kind)).await
    }

    async fn lookup_public(&self, name: &str) -> Result<DnsAnswer, TrustLensError> {
        let fqdn = absolute_name(name)?;
        Self::query(&self.public, fqdn, RecordType::A).await
    }

    async fn reverse(&self, ip: IpAddr) -> Result<DnsAnswer, TrustLensError> {
        Self::query(&self.system, Name::from(ip), RecordType::PTR).await
    }

    async fn tls_handshake(&self, domain: &str) -> TlsOutcome {
        let server_name = match ServerName::try_from(domain.to_string()) {
            Ok(name) => name,
            Err(e) => return TlsOutcome::Failed(format!("Invalid server name: {}", e)),
        };

        let tcp = match tokio::time::timeout(self.timeout, TcpStream::connect((domain, 443))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return TlsOutcome::Unreachable(e.to_string()),
            Err(_) => return TlsOutcome::Unreachable("Connection timed out".to_string()),
        };

        let connector = TlsConnector::from(self.tls.clone());
        let stream = match tokio::time::timeout(self.timeout, connector.connect(server_name, tcp)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return TlsOutcome::Failed(e.to_string()),
            Err(_) => return TlsOutcome::Unreachable("TLS handshake timed out".to_string()),
        };

        let (_, conn) = stream.get_ref();
        let version = conn
            .protocol_version()
            .map(protocol_name)
            .unwrap_or_else(|| "unknown".to_string());
        let cipher = conn
            .negotiated_cipher_suite()
            .map(|suite| format!("{:?}", suite.suite()))
            .unwrap_or_else(|| "unknown".to_string());
        let not_before = conn
            .peer_certificates()
            .and_then(|certs| certs.first())
            .and_then(|der| x509_parser::parse_x509_certificate(der.as_ref()).ok())
            .and_then(|(_, cert)| DateTime::<Utc>::from_timestamp(cert.validity().not_before.timestamp(), 0));

        debug!(domain = %domain, version = %version, cipher = %cipher, "TLS handshake completed");
        TlsOutcome::Established(TlsInfo { version, cipher, not_before })
    }

    async fn fetch(&self, url: &str) -> HttpOutcome {
        match self.http.get(url).send().await {
            Ok(resp) => HttpOutcome::Response(HttpResponse {
                status: resp.status().as_u16(),
                final_url: resp.url().to_string(),
                hsts: resp.headers().contains_key("strict-transport-security"),
            }),
            Err(e) if is_tls_error(&e) => HttpOutcome::TlsError(e.to_string()),
            Err(e) => HttpOutcome::Unreachable(e.to_string()),
        }
    }

    async fn geoip(&self, ip: &str) -> Result<Option<GeoInfo>, TrustLensError> {
        let resp = self
            .http
            .get(format!("{}/{}", self.geoip_url, ip))
            .send()
            .await?
            .error_for_status()?;
        let data: GeoIpResponse = resp.json().await?;
        if data.status != "success" {
            return Ok(None);
        }
        Ok(Some(GeoInfo { country: data.country, city: data.city, isp: data.isp }))
    }

    async fn whois_creation_dates(&self, domain: &str) -> Result<Vec<DateTime<Utc>>, TrustLensError> {
        whois::creation_dates(&self.whois_referral_server, domain, self.timeout).await
    }

    async fn ct_entry_dates(&self, domain: &str) -> Result<Vec<DateTime<Utc>>, TrustLensError> {
        let resp = self
            .http
            .get(format!("{}/", self.ct_log_url))
            .query(&[("q", domain), ("output", "json")])
            .send()
            .await?
            .error_for_status()?;
        let entries: Vec<CtEntry> = resp.json().await?;
        Ok(entries
            .iter()
            .filter_map(|e| e.entry_timestamp.as_deref())
            .filter_map(parse_ct_timestamp)
            .collect())
    }
}
