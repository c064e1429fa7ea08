use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::config::BlockerConfig;
use crate::errors::TrustLensError;
use crate::models::BlockStatus;
use super::DomainBlocker;

/// Blocks domains by pointing them at a sink address in a hosts file.
pub struct HostsFileBlocker {
    path: PathBuf,
    redirect_ip: String,
}

impl HostsFileBlocker {
    pub fn new(path: impl Into<PathBuf>, redirect_ip: impl Into<String>) -> Self {
        Self { path: path.into(), redirect_ip: redirect_ip.into() }
    }

    pub fn from_config(config: &BlockerConfig) -> Self {
        Self::new(&config.hosts_file, &config.redirect_ip)
    }

    async fn try_block(&self, domain: &str) -> Result<BlockStatus, TrustLensError> {
        let existing = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        if lists_host(&existing, domain) {
            return Ok(BlockStatus::AlreadyBlocked);
        }

        let mut entry = String::new();
        if !existing.is_empty() && !existing.ends_with('\n') {
            entry.push('\n');
        }
        entry.push_str(&format!("{} {}\n", self.redirect_ip, domain));
        if !domain.starts_with("www.") {
            entry.push_str(&format!("{} www.{}\n", self.redirect_ip, domain));
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(entry.as_bytes()).await?;
        file.flush().await?;
        Ok(BlockStatus::Blocked)
    }
}

/// True when any non-comment line maps `domain` to some address.
fn lists_host(content: &str, domain: &str) -> bool {
    content.lines().any(|line| {
        let line = line.split('#').next().unwrap_or("");
        line.split_whitespace()
            .skip(1)
            .any(|host| host.eq_ignore_ascii_case(domain))
    })
}

#[async_trait]
impl DomainBlocker for HostsFileBlocker {
    async fn block(&self, domain: &str) -> BlockStatus {
        match self.try_block(domain).await {
            Ok(status) => {
                info!(domain = %domain, status = ?status, hosts_file = %self.path.display(), "Block applied");
                status
            }
            Err(TrustLensError::Io(e)) if e.kind() == ErrorKind::PermissionDenied => {
                warn!(domain = %domain, hosts_file = %self.path.display(), "Permission denied writing hosts file");
                BlockStatus::PermissionDenied
            }
            Err(e) => {
                warn!(domain = %domain, error = %e, "Failed to block domain");
                BlockStatus::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_host_ignores_comments() {
        let content = "127.0.0.1 localhost\n# 127.0.0.1 evil.com\n0.0.0.0 tracker.net ads.net # blocked\n";
        assert!(lists_host(content, "localhost"));
        assert!(lists_host(content, "ads.net"));
        assert!(!lists_host(content, "evil.com"));
        assert!(!lists_host(content, "127.0.0.1"));
    }

    #[tokio::test]
    async fn test_block_appends_domain_and_www() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts");
        std::fs::write(&path, "127.0.0.1 localhost").unwrap();

        let blocker = HostsFileBlocker::new(&path, "127.0.0.1");
        assert_eq!(blocker.block("evil.com").await, BlockStatus::Blocked);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "127.0.0.1 localhost\n127.0.0.1 evil.com\n127.0.0.1 www.evil.com\n");
    }

    #[tokio::test]
    async fn test_second_block_is_already_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts");

        let blocker = HostsFileBlocker::new(&path, "0.0.0.0");
        assert_eq!(blocker.block("evil.com").await, BlockStatus::Blocked);
        assert_eq!(blocker.block("evil.com").await, BlockStatus::AlreadyBlocked);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("0.0.0.0 evil.com\n").count(), 1);
    }

    #[tokio::test]
    async fn test_unwritable_target_is_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending.
        let blocker = HostsFileBlocker::new(dir.path(), "127.0.0.1");
        let status = blocker.block("evil.com").await;
        assert!(matches!(status, BlockStatus::Error | BlockStatus::PermissionDenied));
        assert!(!status.is_effective());
    }
}
