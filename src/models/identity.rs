use std::net::IpAddr;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::TrustLensError;

/// Deterministic identity of a URL: hex SHA-256 of its normalized form.
/// This is the join key across cache, persistence and block records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlId(String);

impl UrlId {
    pub fn from_normalized(normalized: &str) -> Self {
        let digest = Sha256::digest(normalized.as_bytes());
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UrlId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated http(s) URL together with everything derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl {
    pub normalized: String,
    pub host: String,
    /// Registrable domain probed by the orchestrator.
    pub domain: String,
    pub id: UrlId,
}

impl TargetUrl {
    pub fn parse(raw: &str) -> Result<Self, TrustLensError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TrustLensError::InvalidUrl("No URL provided".into()));
        }

        let url = Url::parse(trimmed)
            .map_err(|e| TrustLensError::InvalidUrl(format!("{}: {}", trimmed, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(TrustLensError::InvalidUrl(format!(
                "Unsupported scheme '{}' in {}",
                url.scheme(),
                trimmed
            )));
        }

        let host = url
            .host_str()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']').trim_end_matches('.').to_string())
            .filter(|h| !h.is_empty())
            .ok_or_else(|| TrustLensError::InvalidUrl(format!("No host in {}", trimmed)))?;

        if host.parse::<IpAddr>().is_err() && !host.contains('.') {
            return Err(TrustLensError::InvalidUrl(format!("Host '{}' is not a domain name", host)));
        }

        let normalized = url.to_string();
        Ok(Self {
            domain: registrable_domain(&host),
            id: UrlId::from_normalized(&normalized),
            normalized,
            host,
        })
    }

    /// Host name handed to the blocker: the URL's own host without a leading `www.`.
    pub fn block_host(&self) -> &str {
        self.host.strip_prefix("www.").unwrap_or(&self.host)
    }
}

/// Reduce a host name to its registrable domain (`www.shop.example.co.uk` -> `example.co.uk`)
/// using the Public Suffix List. IP literals, and hosts that are themselves a
/// public suffix, are returned unchanged.
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_lowercase();
    if host.parse::<IpAddr>().is_ok() {
        return host;
    }
    match psl::domain_str(&host) {
        Some(domain) => domain.to_string(),
        None => host,
    }
}
