use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::errors::TrustLensError;
use crate::models::DetectionStats;

/// Remote analysis progress as reported by the scan service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
    Queued,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub state: AnalysisState,
    pub stats: DetectionStats,
    /// Engine name to that engine's verdict.
    pub results: BTreeMap<String, String>,
}

/// Submit/poll contract of an external URL reputation service.
#[async_trait]
pub trait ScanApi: Send + Sync {
    /// Submit a URL and return the opaque analysis handle.
    async fn submit(&self, url: &str) -> Result<String, TrustLensError>;

    async fn poll(&self, analysis_id: &str) -> Result<AnalysisReport, TrustLensError>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct SubmitData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AnalysisData {
    attributes: AnalysisAttributes,
}

#[derive(Debug, Deserialize)]
struct AnalysisAttributes {
    status: String,
    #[serde(default)]
    stats: DetectionStats,
    #[serde(default)]
    results: BTreeMap<String, EngineResult>,
}

#[derive(Debug, Deserialize)]
struct EngineResult {
    category: Option<String>,
    result: Option<String>,
}

/// VirusTotal v3 client.
pub struct VirusTotalApi {
    client: Client,
    base_url: String,
    api_key: String,
}

impl VirusTotalApi {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, TrustLensError> {
        if api_key.is_empty() {
            return Err(TrustLensError::Config("Reputation service API key is not set".into()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrustLensError::Internal(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

/// Map a non-success HTTP status to the error the adapter reports.
fn status_error(status: StatusCode, during: &str) -> TrustLensError {
    match status.as_u16() {
        429 => TrustLensError::RateLimit(format!(
            "Reputation service rate limit exceeded during {}. Please try again later.",
            during
        )),
        400 => TrustLensError::ReputationService(format!("Malformed {} request (HTTP 400)", during)),
        401 => TrustLensError::ReputationService("Invalid or missing API key (HTTP 401)".into()),
        403 => TrustLensError::ReputationService(format!("Forbidden: {} not permitted for this API key (HTTP 403)", during)),
        code => TrustLensError::ReputationService(format!("{} failed with HTTP {}", during, code)),
    }
}

fn parse_analysis(body: &str) -> Result<AnalysisReport, TrustLensError> {
    let envelope: Envelope<AnalysisData> = serde_json::from_str(body)?;
    let attributes = envelope.data.attributes;
    let state = match attributes.status.as_str() {
        "completed" => AnalysisState::Completed,
        "in-progress" => AnalysisState::InProgress,
        _ => AnalysisState::Queued,
    };
    let results = attributes
        .results
        .into_iter()
        .map(|(engine, r)| {
            let verdict = r.result.or(r.category).unwrap_or_else(|| "unrated".to_string());
            (engine, verdict)
        })
        .collect();
    Ok(AnalysisReport { state, stats: attributes.stats, results })
}

#[async_trait]
impl ScanApi for VirusTotalApi {
    async fn submit(&self, url: &str) -> Result<String, TrustLensError> {
        let resp = self
            .client
            .post(format!("{}/urls", self.base_url))
            .header("x-apikey", &self.api_key)
            .form(&[("url", url)])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(status_error(resp.status(), "submission"));
        }

        let envelope: Envelope<SubmitData> = resp
            .json()
            .await
            .map_err(|e| TrustLensError::ReputationService(format!("Unexpected submission response: {}", e)))?;
        debug!(analysis_id = %envelope.data.id, "URL submitted for analysis");
        Ok(envelope.data.id)
    }

    async fn poll(&self, analysis_id: &str) -> Result<AnalysisReport, TrustLensError> {
        let resp = self
            .client
            .get(format!("{}/analyses/{}", self.base_url, analysis_id))
            .header("x-apikey", &self.api_key)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(status_error(resp.status(), "polling"));
        }

        let body = resp.text().await?;
        parse_analysis(&body)
    }
}
