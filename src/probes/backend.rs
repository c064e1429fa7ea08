use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::TrustLensError;

/// DNS record types the probe battery asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    A,
    Aaaa,
    Mx,
    Txt,
    Dnskey,
    Caa,
}

/// Outcome of a DNS query. "No such name" and "no records of that type" are
/// ordinary answers, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsAnswer {
    Records(Vec<String>),
    NoAnswer,
    NxDomain,
}

impl DnsAnswer {
    pub fn records(&self) -> &[String] {
        match self {
            DnsAnswer::Records(records) => records,
            _ => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsInfo {
    /// Protocol name as `TLSv1.2` / `TLSv1.3`.
    pub version: String,
    pub cipher: String,
    pub not_before: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsOutcome {
    Established(TlsInfo),
    /// TCP connect to 443 failed or timed out.
    Unreachable(String),
    /// Connected, but the handshake or certificate validation failed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub final_url: String,
    pub hsts: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpOutcome {
    Response(HttpResponse),
    TlsError(String),
    Unreachable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoInfo {
    pub country: String,
    pub city: String,
    pub isp: String,
}

/// Network primitives the probe battery is built on.
#[async_trait]
pub trait ProbeBackend: Send + Sync {
    /// Query the system resolver.
    async fn lookup(&self, name: &str, kind: RecordKind) -> Result<DnsAnswer, TrustLensError>;

    /// A-record query against the public resolver, used for the existence check.
    async fn lookup_public(&self, name: &str) -> Result<DnsAnswer, TrustLensError>;

    /// PTR query.
    async fn reverse(&self, ip: IpAddr) -> Result<DnsAnswer, TrustLensError>;

    async fn tls_handshake(&self, domain: &str) -> TlsOutcome;

    /// GET with redirects followed.
    async fn fetch(&self, url: &str) -> HttpOutcome;

    /// `None` when the service answered but could not locate the address.
    async fn geoip(&self, ip: &str) -> Result<Option<GeoInfo>, TrustLensError>;

    /// Every creation date the registry WHOIS reports.
    async fn whois_creation_dates(&self, domain: &str) -> Result<Vec<DateTime<Utc>>, TrustLensError>;

    /// Certificate Transparency log entry timestamps for the domain.
    async fn ct_entry_dates(&self, domain: &str) -> Result<Vec<DateTime<Utc>>, TrustLensError>;
}
