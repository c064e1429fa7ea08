use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ReputationConfig;
use crate::models::{ReputationVerdict, TargetUrl};
use super::api::{AnalysisState, ScanApi};
use super::cache::ReputationCache;

/// Reputation lookups as seen by the evaluation session.
#[async_trait]
pub trait ReputationScanner: Send + Sync {
    /// Always yields a verdict. Failures come back with status `Error`.
    async fn scan(&self, target: &TargetUrl, cancel: &CancellationToken) -> ReputationVerdict;

    fn cached(&self, target: &TargetUrl) -> Option<ReputationVerdict>;
}

/// Lifecycle of one submission.
#[derive(Debug)]
enum ScanState {
    Submitted { analysis_id: String },
    Polling { analysis_id: String, polls: u32 },
    Completed(ReputationVerdict),
    Failed(String),
}

/// Drives submit/poll cycles against a [`ScanApi`] and caches completions.
pub struct ReputationAdapter {
    api: Arc<dyn ScanApi>,
    cache: ReputationCache,
    poll_interval: Duration,
    max_polls: u32,
}

impl ReputationAdapter {
    pub fn new(api: Arc<dyn ScanApi>, poll_interval: Duration, max_polls: u32) -> Self {
        Self {
            api,
            cache: ReputationCache::new(),
            poll_interval,
            max_polls,
        }
    }

    pub fn from_config(api: Arc<dyn ScanApi>, config: &ReputationConfig) -> Self {
        Self::new(api, config.poll_interval(), config.max_polls)
    }

    async fn run(&self, url: &str, cancel: &CancellationToken) -> ScanState {
        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => return ScanState::Failed("Reputation scan cancelled".into()),
            r = self.api.submit(url) => r,
        };
        let mut state = match submitted {
            Ok(analysis_id) => ScanState::Submitted { analysis_id },
            Err(e) => ScanState::Failed(e.to_string()),
        };

        loop {
            state = match state {
                ScanState::Submitted { analysis_id } => {
                    info!(url = %url, analysis_id = %analysis_id, "Reputation scan submitted");
                    ScanState::Polling { analysis_id, polls: 0 }
                }
                ScanState::Polling { analysis_id, polls } if polls >= self.max_polls => {
                    warn!(analysis_id = %analysis_id, polls, "Reputation analysis did not complete");
                    ScanState::Failed(format!("Analysis did not complete after {} polls", polls))
                }
                ScanState::Polling { analysis_id, polls } => {
                    let polled = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return ScanState::Failed("Reputation scan cancelled".into()),
                        r = async {
                            tokio::time::sleep(self.poll_interval).await;
                            self.api.poll(&analysis_id).await
                        } => r,
                    };
                    match polled {
                        Ok(report) if report.state == AnalysisState::Completed => {
                            ScanState::Completed(ReputationVerdict::from_stats(report.stats, report.results))
                        }
                        Ok(report) => {
                            debug!(analysis_id = %analysis_id, state = ?report.state, poll = polls + 1, "Analysis pending");
                            ScanState::Polling { analysis_id, polls: polls + 1 }
                        }
                        Err(e) => ScanState::Failed(e.to_string()),
                    }
                }
                terminal @ (ScanState::Completed(_) | ScanState::Failed(_)) => return terminal,
            };
        }
    }
}

#[async_trait]
impl ReputationScanner for ReputationAdapter {
    async fn scan(&self, target: &TargetUrl, cancel: &CancellationToken) -> ReputationVerdict {
        if let Some(hit) = self.cache.get(&target.id) {
            debug!(url = %target.normalized, "Reputation cache hit");
            return hit;
        }

        match self.run(&target.normalized, cancel).await {
            ScanState::Completed(verdict) => {
                info!(url = %target.normalized, status = ?verdict.status, "Reputation scan completed");
                self.cache.insert(target.id.clone(), &verdict);
                verdict
            }
            ScanState::Failed(reason) => {
                warn!(url = %target.normalized, reason = %reason, "Reputation scan failed");
                ReputationVerdict::error(reason)
            }
            other => ReputationVerdict::error(format!("Reputation scan ended unexpectedly: {:?}", other)),
        }
    }

    fn cached(&self, target: &TargetUrl) -> Option<ReputationVerdict> {
        self.cache.get(&target.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TrustLensError;
    use crate::models::{DetectionStats, ReputationStatus};
    use crate::reputation::api::AnalysisReport;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct ScriptedApi {
        rate_limited: bool,
        polls: Mutex<VecDeque<Result<AnalysisReport, TrustLensError>>>,
        submits: AtomicU32,
        poll_calls: AtomicU32,
    }

    impl ScriptedApi {
        fn new(polls: Vec<Result<AnalysisReport, TrustLensError>>) -> Self {
            Self {
                rate_limited: false,
                polls: Mutex::new(polls.into()),
                submits: AtomicU32::new(0),
                poll_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ScanApi for ScriptedApi {
        async fn submit(&self, _url: &str) -> Result<String, TrustLensError> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            if self.rate_limited {
                return Err(TrustLensError::RateLimit("quota exceeded".into()));
            }
            Ok("analysis-1".to_string())
        }

        async fn poll(&self, _analysis_id: &str) -> Result<AnalysisReport, TrustLensError> {
            self.poll_calls.fetch_add(1, Ordering::SeqCst);
            self.polls.lock().unwrap().pop_front().unwrap_or_else(|| Ok(pending()))
        }
    }

    fn pending() -> AnalysisReport {
        AnalysisReport {
            state: AnalysisState::Queued,
            stats: DetectionStats::default(),
            results: BTreeMap::new(),
        }
    }

    fn completed(malicious: u32) -> AnalysisReport {
        let mut results = BTreeMap::new();
        results.insert("EngineA".to_string(), if malicious > 0 { "phishing" } else { "clean" }.to_string());
        AnalysisReport {
            state: AnalysisState::Completed,
            stats: DetectionStats { malicious, harmless: 40, ..Default::default() },
            results,
        }
    }

    fn target() -> TargetUrl {
        TargetUrl::parse("https://example.com/login").unwrap()
    }

    fn adapter(api: Arc<ScriptedApi>, max_polls: u32) -> ReputationAdapter {
        ReputationAdapter::new(api, Duration::from_millis(1), max_polls)
    }

    #[tokio::test]
    async fn test_polls_until_completed_and_caches() {
        let api = Arc::new(ScriptedApi::new(vec![Ok(pending()), Ok(pending()), Ok(completed(3))]));
        let adapter = adapter(api.clone(), 10);
        let cancel = CancellationToken::new();

        let verdict = adapter.scan(&target(), &cancel).await;
        assert_eq!(verdict.status, ReputationStatus::Unsafe);
        assert_eq!(verdict.raw_engine_results.get("EngineA").map(String::as_str), Some("phishing"));
        assert_eq!(api.poll_calls.load(Ordering::SeqCst), 3);

        let again = adapter.scan(&target(), &cancel).await;
        assert_eq!(again, verdict);
        assert_eq!(api.submits.load(Ordering::SeqCst), 1);
        assert_eq!(adapter.cached(&target()), Some(verdict));
    }

    #[tokio::test]
    async fn test_rate_limit_is_error_without_polling() {
        let mut scripted = ScriptedApi::new(vec![]);
        scripted.rate_limited = true;
        let api = Arc::new(scripted);
        let adapter = adapter(api.clone(), 10);

        let verdict = adapter.scan(&target(), &CancellationToken::new()).await;
        assert_eq!(verdict.status, ReputationStatus::Error);
        assert!(verdict.message.contains("quota exceeded"));
        assert_eq!(api.poll_calls.load(Ordering::SeqCst), 0);
        assert!(adapter.cached(&target()).is_none());
    }

    #[tokio::test]
    async fn test_poll_error_surfaces_as_error_verdict() {
        let api = Arc::new(ScriptedApi::new(vec![
            Ok(pending()),
            Err(TrustLensError::ReputationService("Invalid or missing API key (HTTP 401)".into())),
        ]));
        let verdict = adapter(api, 10).scan(&target(), &CancellationToken::new()).await;
        assert_eq!(verdict.status, ReputationStatus::Error);
        assert!(verdict.message.contains("API key"));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_polls() {
        let api = Arc::new(ScriptedApi::new(vec![]));
        let verdict = adapter(api.clone(), 4).scan(&target(), &CancellationToken::new()).await;
        assert_eq!(verdict.status, ReputationStatus::Error);
        assert!(verdict.message.contains("4 polls"));
        assert_eq!(api.poll_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_cancellation_stops_polling() {
        let api = Arc::new(ScriptedApi::new(vec![]));
        let adapter = ReputationAdapter::new(api.clone(), Duration::from_secs(60), 10);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let verdict = tokio::time::timeout(Duration::from_secs(5), adapter.scan(&target(), &cancel))
            .await
            .expect("scan should stop on cancel");
        assert_eq!(verdict.status, ReputationStatus::Error);
        assert!(verdict.message.contains("cancelled"));
        assert_eq!(api.poll_calls.load(Ordering::SeqCst), 0);
    }
}
