use async_trait::async_trait;
use dashmap::DashMap;

use crate::errors::TrustLensError;
use crate::models::{TrustVerdict, UrlId};
use super::VerdictStore;

/// Volatile store for tests and `storage.in_memory` runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    verdicts: DashMap<UrlId, TrustVerdict>,
    blocked: DashMap<UrlId, Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }
}

#[async_trait]
impl VerdictStore for MemoryStore {
    async fn get(&self, id: &UrlId) -> Result<Option<TrustVerdict>, TrustLensError> {
        Ok(self.verdicts.get(id).map(|v| v.value().clone()))
    }

    async fn put(&self, verdict: &TrustVerdict) -> Result<(), TrustLensError> {
        self.verdicts.insert(verdict.id.clone(), verdict.clone());
        Ok(())
    }

    async fn is_blocked(&self, id: &UrlId) -> Result<bool, TrustLensError> {
        Ok(self.blocked.contains_key(id))
    }

    async fn record_blocked(&self, verdict: &TrustVerdict, user_id: Option<&str>) -> Result<(), TrustLensError> {
        self.blocked.insert(verdict.id.clone(), user_id.map(str::to_string));
        Ok(())
    }
}
