use dashmap::DashMap;

use crate::models::{ReputationStatus, ReputationVerdict, UrlId};

/// Process-lifetime cache of completed reputation scans keyed by URL identity.
#[derive(Debug, Default)]
pub struct ReputationCache {
    entries: DashMap<UrlId, ReputationVerdict>,
}

impl ReputationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &UrlId) -> Option<ReputationVerdict> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    /// Stores conclusive verdicts only. Errors and inconclusive scans are
    /// dropped so the next evaluation submits again.
    pub fn insert(&self, id: UrlId, verdict: &ReputationVerdict) -> bool {
        if matches!(verdict.status, ReputationStatus::Error | ReputationStatus::Unknown) {
            return false;
        }
        self.entries.insert(id, verdict.clone());
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
