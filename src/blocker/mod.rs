pub mod hosts;

use async_trait::async_trait;

use crate::models::BlockStatus;

pub use hosts::HostsFileBlocker;

/// Host-level blocking side effect. Idempotent: blocking twice reports `AlreadyBlocked`.
#[async_trait]
pub trait DomainBlocker: Send + Sync {
    async fn block(&self, domain: &str) -> BlockStatus;
}
