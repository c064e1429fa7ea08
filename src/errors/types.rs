use thiserror::Error;

use crate::models::TrustVerdict;

#[derive(Debug, Error)]
pub enum TrustLensError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Rate limited: {0}")]
    RateLimit(String),

    #[error("Reputation service error: {0}")]
    ReputationService(String),

    #[error("Probe error: {0}")]
    Probe(String),

    /// The DNS existence check itself failed, as opposed to "domain does not exist".
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// The verdict could not be durably recorded. Carries the in-memory result when one exists.
    #[error("Persistence error: {reason}")]
    Persistence {
        reason: String,
        best_effort: Option<Box<TrustVerdict>>,
    },

    #[error("Summarizer error: {0}")]
    Summarizer(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TrustLensError {
    pub fn persistence(reason: impl Into<String>) -> Self {
        TrustLensError::Persistence { reason: reason.into(), best_effort: None }
    }

    /// The best-effort verdict attached to a persistence failure, if any.
    pub fn best_effort_verdict(&self) -> Option<&TrustVerdict> {
        match self {
            TrustLensError::Persistence { best_effort, .. } => best_effort.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TrustLensError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TrustLensError::Timeout(e.to_string())
        } else {
            TrustLensError::Network(e.to_string())
        }
    }
}

impl From<rusqlite::Error> for TrustLensError {
    fn from(e: rusqlite::Error) -> Self {
        TrustLensError::Database(e.to_string())
    }
}
