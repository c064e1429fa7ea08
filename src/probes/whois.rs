use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::errors::TrustLensError;

const WHOIS_PORT: u16 = 43;
const MAX_RESPONSE_BYTES: u64 = 256 * 1024;

const CREATION_KEYS: &[&str] = &[
    "creation date",
    "created",
    "created on",
    "created date",
    "registered",
    "registered on",
    "registration time",
    "registration date",
    "domain registration date",
    "domain record activated",
];

/// Send one WHOIS query and read the full response.
pub async fn query(server: &str, query: &str, timeout: Duration) -> Result<String, TrustLensError> {
    let mut stream = tokio::time::timeout(timeout, TcpStream::connect((server, WHOIS_PORT)))
        .await
        .map_err(|_| TrustLensError::Timeout(format!("WHOIS connect to {} timed out", server)))??;

    stream.write_all(format!("{}\r\n", query).as_bytes()).await?;

    let mut buf = Vec::new();
    tokio::time::timeout(timeout, (&mut stream).take(MAX_RESPONSE_BYTES).read_to_end(&mut buf))
        .await
        .map_err(|_| TrustLensError::Timeout(format!("WHOIS read from {} timed out", server)))??;

    debug!(server = %server, bytes = buf.len(), "WHOIS response received");
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Look up a domain's creation dates: IANA referral for the TLD, then the registry.
pub async fn creation_dates(
    referral_server: &str,
    domain: &str,
    timeout: Duration,
) -> Result<Vec<DateTime<Utc>>, TrustLensError> {
    let tld = domain
        .rsplit('.')
        .next()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| TrustLensError::Probe(format!("No TLD in '{}'", domain)))?;

    let referral = query(referral_server, tld, timeout).await?;
    let server = parse_referral(&referral)
        .ok_or_else(|| TrustLensError::Probe(format!("No WHOIS server known for .{}", tld)))?;

    let response = query(&server, domain, timeout).await?;
    Ok(parse_creation_dates(&response))
}

/// The registry server named in an IANA referral response.
pub fn parse_referral(response: &str) -> Option<String> {
    response.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        let key = key.trim().to_lowercase();
        let value = value.trim();
        if (key == "refer" || key == "whois") && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// Every parseable creation date in a WHOIS response.
pub fn parse_creation_dates(response: &str) -> Vec<DateTime<Utc>> {
    response
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim().to_lowercase();
            if CREATION_KEYS.contains(&key.as_str()) {
                parse_date(value)
            } else {
                None
            }
        })
        .collect()
}

pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let value = raw.trim();
    // Some registries append a note: "2001-02-03 (dd-mm-yyyy)".
    let value = value.split(" (").next().unwrap_or(value).trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let naive = value.trim_end_matches(" UTC").trim_end_matches('Z');
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in ["%Y-%m-%d", "%d-%b-%Y", "%Y.%m.%d", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(naive, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}
