use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fusion::FusionPolicy;
use crate::probes::scoring::ScoringPolicy;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TrustLensConfig {
    pub probes: ProbeConfig,
    pub scoring: ScoringPolicy,
    pub reputation: ReputationConfig,
    pub fusion: FusionConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub summarizer: Option<SummarizerConfig>,
    pub blocker: Option<BlockerConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Per-probe timeout.
    pub timeout_secs: u64,
    /// Maximum number of probes in flight for one assessment.
    pub concurrency: usize,
    /// Resolver used for the secondary existence check.
    pub public_resolver: String,
    pub blacklist_servers: Vec<String>,
    pub common_subdomains: Vec<String>,
    /// MX host suffix to provider display name.
    pub trusted_email_providers: BTreeMap<String, String>,
    pub geoip_url: String,
    pub ct_log_url: String,
    pub whois_referral_server: String,
    pub user_agent: String,
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        let providers = [
            ("google.com", "Google Mail"),
            ("outlook.com", "Microsoft Outlook"),
            ("amazonses.com", "Amazon SES"),
            ("mailchimp.com", "Mailchimp"),
            ("yahoo.com", "Yahoo Mail"),
            ("zoho.com", "Zoho Mail"),
            ("protonmail.com", "ProtonMail"),
        ];
        Self {
            timeout_secs: 8,
            concurrency: 8,
            public_resolver: "8.8.8.8".to_string(),
            blacklist_servers: vec!["zen.spamhaus.org".to_string()],
            common_subdomains: ["www", "mail", "ftp", "blog", "shop"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            trusted_email_providers: providers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            geoip_url: "http://ip-api.com/json".to_string(),
            ct_log_url: "https://crt.sh".to_string(),
            whois_referral_server: "whois.iana.org".to_string(),
            user_agent: "TrustLens/1.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReputationConfig {
    /// API key, or `$ENV_VAR` reference.
    pub api_key: String,
    pub base_url: String,
    pub poll_interval_secs: u64,
    pub max_polls: u32,
    pub request_timeout_secs: u64,
}

impl ReputationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            api_key: "$VIRUSTOTAL_API_KEY".to_string(),
            base_url: "https://www.virustotal.com/api/v3".to_string(),
            poll_interval_secs: 5,
            max_polls: 60,
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FusionConfig {
    pub policy: FusionPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_attempts: u32,
    pub retry_backoff_secs: u64,
    /// Overall deadline for one `process_url` call.
    pub deadline_secs: u64,
    pub persist_retries: u32,
}

impl SessionConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_backoff_secs: 10,
            deadline_secs: 120,
            persist_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database: String,
    /// Keep verdicts in process memory only.
    pub in_memory: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: "./data/trustlens.db".to_string(),
            in_memory: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub provider: String,
    pub api_key: String,
    pub model: String,
    pub max_output_tokens: u32,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            api_key: "$GEMINI_API_KEY".to_string(),
            model: "gemini-1.5-flash".to_string(),
            max_output_tokens: 150,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockerConfig {
    pub hosts_file: String,
    pub redirect_ip: String,
}

impl Default for BlockerConfig {
    fn default() -> Self {
        Self {
            hosts_file: "/etc/hosts".to_string(),
            redirect_ip: "127.0.0.1".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = TrustLensConfig::default();
        assert_eq!(config.session.max_attempts, 2);
        assert_eq!(config.session.retry_backoff(), Duration::from_secs(10));
        assert_eq!(config.reputation.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.probes.public_resolver, "8.8.8.8");
        assert!(config.summarizer.is_none());
        assert!(config.blocker.is_none());
    }

    #[test]
    fn test_probe_defaults_match_known_providers() {
        let probes = ProbeConfig::default();
        assert_eq!(probes.trusted_email_providers.get("google.com").map(String::as_str), Some("Google Mail"));
        assert_eq!(probes.common_subdomains.len(), 5);
        assert_eq!(probes.blacklist_servers, vec!["zen.spamhaus.org".to_string()]);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: TrustLensConfig = serde_yaml::from_str("session:\n  max_attempts: 3\n").unwrap();
        assert_eq!(config.session.max_attempts, 3);
        assert_eq!(config.session.deadline_secs, 120);
        assert_eq!(config.probes.timeout_secs, 8);
    }

    #[test]
    fn test_blocker_section_enables_defaults() {
        let config: TrustLensConfig = serde_yaml::from_str("blocker: {}\n").unwrap();
        let blocker = config.blocker.unwrap();
        assert_eq!(blocker.hosts_file, "/etc/hosts");
        assert_eq!(blocker.redirect_ip, "127.0.0.1");
    }
}
