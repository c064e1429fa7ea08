pub mod memory;
pub mod schema;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::StorageConfig;
use crate::errors::TrustLensError;
use crate::models::{TrustVerdict, UrlId};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Durable record of verdicts keyed by URL identity, plus the block registry.
#[async_trait]
pub trait VerdictStore: Send + Sync {
    async fn get(&self, id: &UrlId) -> Result<Option<TrustVerdict>, TrustLensError>;

    /// Idempotent overwrite. The latest write for an id wins.
    async fn put(&self, verdict: &TrustVerdict) -> Result<(), TrustLensError>;

    async fn is_blocked(&self, id: &UrlId) -> Result<bool, TrustLensError>;

    async fn record_blocked(&self, verdict: &TrustVerdict, user_id: Option<&str>) -> Result<(), TrustLensError>;
}

pub fn open(config: &StorageConfig) -> Result<Arc<dyn VerdictStore>, TrustLensError> {
    if config.in_memory {
        return Ok(Arc::new(MemoryStore::new()));
    }
    Ok(Arc::new(SqliteStore::new(&config.database)?))
}
