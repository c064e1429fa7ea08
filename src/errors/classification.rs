use super::types::TrustLensError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
}

impl TrustLensError {
    /// Classify this error to determine its type and whether it can be retried.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Retryable errors
            TrustLensError::Network(_) => ErrorClassification {
                error_type: "NetworkError",
                retryable: true,
            },
            TrustLensError::Timeout(_) => ErrorClassification {
                error_type: "TimeoutError",
                retryable: true,
            },
            TrustLensError::Database(_) => ErrorClassification {
                error_type: "DatabaseError",
                retryable: true,
            },
            TrustLensError::Io(_) => ErrorClassification {
                error_type: "IoError",
                retryable: true,
            },
            TrustLensError::Summarizer(_) => ErrorClassification {
                error_type: "SummarizerError",
                retryable: true,
            },
            TrustLensError::Persistence { .. } => ErrorClassification {
                error_type: "PersistenceError",
                retryable: true,
            },

            // Rate limits are a hard stop for the attempt; the caller retries the whole flow.
            TrustLensError::RateLimit(_) => ErrorClassification {
                error_type: "RateLimitError",
                retryable: false,
            },

            // Non-retryable errors
            TrustLensError::ReputationService(_) => ErrorClassification {
                error_type: "ReputationServiceError",
                retryable: false,
            },
            TrustLensError::Probe(_) => ErrorClassification {
                error_type: "ProbeError",
                retryable: false,
            },
            TrustLensError::Resolution(_) => ErrorClassification {
                error_type: "ResolutionError",
                retryable: false,
            },
            TrustLensError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                retryable: false,
            },
            TrustLensError::InvalidUrl(_) => ErrorClassification {
                error_type: "InvalidUrlError",
                retryable: false,
            },
            TrustLensError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                retryable: false,
            },
            TrustLensError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                retryable: false,
            },
            TrustLensError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                retryable: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_is_not_retryable() {
        let err = TrustLensError::RateLimit("429".into());
        let class = err.classify();
        assert!(!class.retryable);
        assert_eq!(class.error_type, "RateLimitError");
    }

    #[test]
    fn test_database_error_retryable() {
        let err = TrustLensError::Database("locked".into());
        let class = err.classify();
        assert!(class.retryable);
        assert_eq!(class.error_type, "DatabaseError");
    }

    #[test]
    fn test_network_error_retryable() {
        assert!(TrustLensError::Network("connection refused".into()).classify().retryable);
    }

    #[test]
    fn test_timeout_retryable() {
        assert!(TrustLensError::Timeout("timed out".into()).classify().retryable);
    }

    #[test]
    fn test_config_error_not_retryable() {
        assert!(!TrustLensError::Config("bad".into()).classify().retryable);
    }

    #[test]
    fn test_invalid_url_not_retryable() {
        let class = TrustLensError::InvalidUrl("ftp://x".into()).classify();
        assert!(!class.retryable);
        assert_eq!(class.error_type, "InvalidUrlError");
    }

    #[test]
    fn test_persistence_retryable() {
        assert!(TrustLensError::persistence("disk full").classify().retryable);
    }
}
