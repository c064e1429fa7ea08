use std::path::Path;
use crate::errors::TrustLensError;
use super::types::TrustLensConfig;
use super::schema::CONFIG_SCHEMA;
use tracing::warn;

pub async fn parse_config(path: &Path) -> Result<TrustLensConfig, TrustLensError> {
    if !path.exists() {
        return Err(TrustLensError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(TrustLensError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

/// Parse configuration from YAML text. An empty document yields the defaults.
pub fn parse_config_str(content: &str) -> Result<TrustLensConfig, TrustLensError> {
    if content.trim().is_empty() {
        return Ok(TrustLensConfig::default());
    }

    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;

    // JSON Schema validation
    validate_schema(&yaml)?;

    // Parse into typed config
    let config: TrustLensConfig = serde_yaml::from_value(yaml)?;

    // Semantic conflict detection
    validate_conflicts(&config)?;

    Ok(config)
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), TrustLensError> {
    // Convert YAML value to JSON for schema validation
    let json_str = serde_json::to_string(yaml)
        .map_err(|e| TrustLensError::Config(format!("Config conversion error: {}", e)))?;
    let json_value: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| TrustLensError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| TrustLensError::Config(format!("Schema compilation error: {}", e)))?;

    let result = compiled.validate(&json_value);
    if let Err(errors) = result {
        let messages: Vec<String> = errors
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect();
        // Advisory only; the typed parse and conflict checks are authoritative.
        for msg in &messages {
            warn!(validation_error = %msg, "Config schema warning");
        }
    }

    Ok(())
}

/// Detect semantic conflicts in the parsed configuration.
pub fn validate_conflicts(config: &TrustLensConfig) -> Result<(), TrustLensError> {
    if config.reputation.poll_interval_secs == 0 {
        return Err(TrustLensError::Config("reputation.poll_interval_secs must be greater than 0".into()));
    }
    if config.reputation.max_polls == 0 {
        return Err(TrustLensError::Config("reputation.max_polls must be at least 1".into()));
    }
    if config.session.max_attempts == 0 {
        return Err(TrustLensError::Config("session.max_attempts must be at least 1".into()));
    }
    if config.probes.concurrency == 0 {
        return Err(TrustLensError::Config("probes.concurrency must be at least 1".into()));
    }
    if config.probes.timeout_secs == 0 {
        return Err(TrustLensError::Config("probes.timeout_secs must be greater than 0".into()));
    }
    if config.scoring.min_safe_score > 100 {
        return Err(TrustLensError::Config("scoring.min_safe_score must be within 0..=100".into()));
    }

    // A probe battery that cannot finish inside the session deadline always ends UNKNOWN.
    if config.probes.timeout_secs >= config.session.deadline_secs {
        warn!(
            probe_timeout = config.probes.timeout_secs,
            deadline = config.session.deadline_secs,
            "Probe timeout is not shorter than the session deadline"
        );
    }

    if let Some(blocker) = &config.blocker {
        if blocker.redirect_ip.parse::<std::net::IpAddr>().is_err() {
            return Err(TrustLensError::Config(format!(
                "blocker.redirect_ip '{}' is not an IP address",
                blocker.redirect_ip
            )));
        }
    }

    if let Some(summarizer) = &config.summarizer {
        if summarizer.api_key.is_empty() {
            warn!("Summarizer configured but no API key provided");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlockerConfig;
    use crate::fusion::FusionPolicy;

    #[test]
    fn test_validate_conflicts_default_config() {
        let config = TrustLensConfig::default();
        assert!(validate_conflicts(&config).is_ok());
    }

    #[test]
    fn test_validate_conflicts_zero_poll_interval() {
        let mut config = TrustLensConfig::default();
        config.reputation.poll_interval_secs = 0;
        assert!(validate_conflicts(&config).is_err());
    }

    #[test]
    fn test_validate_conflicts_zero_attempts() {
        let mut config = TrustLensConfig::default();
        config.session.max_attempts = 0;
        assert!(validate_conflicts(&config).is_err());
    }

    #[test]
    fn test_validate_conflicts_zero_concurrency() {
        let mut config = TrustLensConfig::default();
        config.probes.concurrency = 0;
        assert!(validate_conflicts(&config).is_err());
    }

    #[test]
    fn test_validate_conflicts_bad_redirect_ip() {
        let config = TrustLensConfig {
            blocker: Some(BlockerConfig {
                hosts_file: "/tmp/hosts".into(),
                redirect_ip: "localhost".into(),
            }),
            ..Default::default()
        };
        assert!(validate_conflicts(&config).is_err());
    }

    #[test]
    fn test_parse_config_str_empty_is_default() {
        let config = parse_config_str("").unwrap();
        assert_eq!(config.session.max_attempts, 2);
        assert_eq!(config.fusion.policy, FusionPolicy::FailClosed);
    }

    #[test]
    fn test_parse_config_str_fusion_policy() {
        let config = parse_config_str("fusion:\n  policy: reputation_first\n").unwrap();
        assert_eq!(config.fusion.policy, FusionPolicy::ReputationFirst);
    }

    #[test]
    fn test_parse_config_str_rejects_conflict() {
        let err = parse_config_str("session:\n  max_attempts: 0\n").unwrap_err();
        assert!(matches!(err, TrustLensError::Config(_)));
    }

    #[test]
    fn test_parse_config_str_scoring_override() {
        use crate::models::Penalty;
        let config = parse_config_str("scoring:\n  points:\n    missing_spf: 25\n").unwrap();
        assert_eq!(config.scoring.points(Penalty::MissingSpf), 25);
        assert_eq!(config.scoring.points(Penalty::MissingDkim), 10);
    }

    #[tokio::test]
    async fn test_parse_config_missing_file() {
        let result = parse_config(Path::new("/nonexistent/trustlens.yaml")).await;
        assert!(matches!(result, Err(TrustLensError::Config(_))));
    }

    #[tokio::test]
    async fn test_parse_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trustlens.yaml");
        tokio::fs::write(&path, "probes:\n  timeout_secs: 3\n  concurrency: 4\n").await.unwrap();
        let config = parse_config(&path).await.unwrap();
        assert_eq!(config.probes.timeout_secs, 3);
        assert_eq!(config.probes.concurrency, 4);
    }
}
