use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::sync::{mpsc, OnceCell};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::blocker::{DomainBlocker, HostsFileBlocker};
use crate::config::{resolve_credential, SessionConfig, TrustLensConfig};
use crate::errors::{with_retry, RetryPolicy, TrustLensError};
use crate::fusion::{fuse, FusionPolicy};
use crate::llm::{create_summarizer, NarrativeSummarizer};
use crate::models::{
    BlockStatus, DomainAssessment, OverallStatus, ReputationVerdict, TargetUrl, TrustVerdict, UrlId,
};
use crate::probes::{DomainAssessor, LiveBackend, ProbeOrchestrator};
use crate::reputation::{ReputationAdapter, ReputationScanner, VirusTotalApi};
use crate::store::{self, VerdictStore};

/// Per-call knobs for [`EvaluationSession::process_url_with`].
#[derive(Debug, Clone)]
pub struct EvaluateOptions {
    pub max_attempts: u32,
    pub deadline: Duration,
    /// Recorded with block registry entries.
    pub user_id: Option<String>,
}

impl EvaluateOptions {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            deadline: config.deadline(),
            user_id: None,
        }
    }
}

/// Result shared between the evaluation leader and any joiners.
#[derive(Debug, Clone)]
enum Outcome {
    Done(TrustVerdict),
    PersistFailed { reason: String, best_effort: TrustVerdict },
}

impl Outcome {
    fn into_result(self) -> Result<TrustVerdict, TrustLensError> {
        match self {
            Outcome::Done(verdict) => Ok(verdict),
            Outcome::PersistFailed { reason, best_effort } => Err(TrustLensError::Persistence {
                reason,
                best_effort: Some(Box::new(best_effort)),
            }),
        }
    }
}

enum PendingWrite {
    Verdict(TrustVerdict),
    Blocked(TrustVerdict, Option<String>),
}

/// Evaluates URLs: cache lookup, probes and reputation scan, fusion,
/// re-evaluation of inconclusive results, persistence and blocking.
/// At most one evaluation runs per URL identity at a time.
pub struct EvaluationSession {
    assessor: Arc<dyn DomainAssessor>,
    scanner: Arc<dyn ReputationScanner>,
    store: Arc<dyn VerdictStore>,
    summarizer: Option<Arc<dyn NarrativeSummarizer>>,
    blocker: Option<Arc<dyn DomainBlocker>>,
    policy: FusionPolicy,
    config: SessionConfig,
    retry_backoff: Duration,
    in_flight: Mutex<HashMap<UrlId, Arc<OnceCell<Outcome>>>>,
}

impl EvaluationSession {
    pub fn new(
        assessor: Arc<dyn DomainAssessor>,
        scanner: Arc<dyn ReputationScanner>,
        store: Arc<dyn VerdictStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            assessor,
            scanner,
            store,
            summarizer: None,
            blocker: None,
            policy: FusionPolicy::default(),
            retry_backoff: config.retry_backoff(),
            config,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Wire the live probe backend, VirusTotal, the configured store and the
    /// optional collaborators.
    pub fn from_config(config: &TrustLensConfig) -> Result<Self, TrustLensError> {
        let backend = Arc::new(LiveBackend::new(&config.probes)?);
        let assessor = Arc::new(ProbeOrchestrator::new(
            backend,
            config.probes.clone(),
            config.scoring.clone(),
        ));

        let api_key = resolve_credential(&config.reputation.api_key);
        let api = Arc::new(VirusTotalApi::new(
            &api_key,
            &config.reputation.base_url,
            config.reputation.request_timeout(),
        )?);
        let scanner = Arc::new(ReputationAdapter::from_config(api, &config.reputation));

        let mut session = Self::new(assessor, scanner, store::open(&config.storage)?, config.session.clone())
            .with_policy(config.fusion.policy);

        if let Some(summarizer_config) = &config.summarizer {
            if let Some(summarizer) = create_summarizer(summarizer_config)? {
                session = session.with_summarizer(summarizer);
            }
        }
        if let Some(blocker_config) = &config.blocker {
            session = session.with_blocker(Arc::new(HostsFileBlocker::from_config(blocker_config)));
        }
        Ok(session)
    }

    pub fn with_policy(mut self, policy: FusionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn NarrativeSummarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_blocker(mut self, blocker: Arc<dyn DomainBlocker>) -> Self {
        self.blocker = Some(blocker);
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub async fn process_url(&self, url: &str) -> Result<TrustVerdict, TrustLensError> {
        self.process_url_with(url, EvaluateOptions::from_config(&self.config)).await
    }

    /// Concurrent callers for the same URL join the in-flight evaluation and
    /// share its deadline and result.
    pub async fn process_url_with(
        &self,
        url: &str,
        options: EvaluateOptions,
    ) -> Result<TrustVerdict, TrustLensError> {
        let target = match TargetUrl::parse(url) {
            Ok(target) => target,
            Err(e) => {
                warn!(url = %url, error = %e, "Rejected URL");
                return Ok(invalid_url_verdict(url, &e));
            }
        };

        let cell = {
            let mut table = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            table.entry(target.id.clone()).or_default().clone()
        };

        let outcome = cell
            .get_or_init(|| self.evaluate(&target, &options))
            .await
            .clone();

        {
            let mut table = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            if table.get(&target.id).is_some_and(|current| Arc::ptr_eq(current, &cell)) {
                table.remove(&target.id);
            }
        }

        outcome.into_result()
    }

    async fn evaluate(&self, target: &TargetUrl, options: &EvaluateOptions) -> Outcome {
        let mut lookup_error = None;
        match self.store.get(&target.id).await {
            Ok(Some(previous)) if previous.is_complete() => {
                info!(url = %target.normalized, overall = %previous.overall, "Serving stored verdict");
                return Outcome::Done(previous);
            }
            Ok(Some(previous)) => {
                debug!(url = %target.normalized, overall = %previous.overall, "Stored verdict incomplete, re-evaluating");
            }
            Ok(None) => {}
            Err(e) => {
                warn!(url = %target.normalized, error = %e, "Verdict lookup failed, evaluating fresh");
                lookup_error = Some(e.to_string());
            }
        }

        let cancel = CancellationToken::new();
        let timer = {
            let cancel = cancel.clone();
            let deadline = options.deadline;
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                cancel.cancel();
            })
        };

        let (writes, writer) = self.spawn_writer();
        let max_attempts = options.max_attempts.max(1);
        let mut best: Option<TrustVerdict> = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                info!(
                    url = %target.normalized,
                    attempt,
                    backoff_ms = self.retry_backoff.as_millis() as u64,
                    "Verdict inconclusive, re-evaluating"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.retry_backoff) => {}
                }
            }

            let (assessment, reputation) = tokio::join!(
                self.assessor.assess_domain(&target.domain, &cancel),
                self.scanner.scan(target, &cancel),
            );

            if cancel.is_cancelled() && best.is_some() {
                warn!(url = %target.normalized, attempt, "Deadline hit mid-attempt, keeping previous verdict");
                break;
            }

            let verdict = self.build_verdict(target, assessment, reputation, attempt);
            info!(
                url = %target.normalized,
                attempt,
                overall = %verdict.overall,
                domain = ?verdict.domain_assessment.classification,
                score = verdict.domain_assessment.security_score,
                "Attempt complete"
            );
            send_write(&writes, PendingWrite::Verdict(verdict.clone()));
            let done = !verdict.overall.needs_reevaluation() || cancel.is_cancelled();
            best = Some(verdict);
            if done {
                break;
            }
        }

        let mut verdict = match best {
            Some(verdict) => verdict,
            None => self.build_verdict(
                target,
                DomainAssessment::unavailable(&target.domain),
                ReputationVerdict::error("Deadline exceeded before evaluation started"),
                0,
            ),
        };

        let mut amended = false;
        if let Some(error) = lookup_error {
            verdict.message = format!("{} (stored verdict lookup failed: {})", verdict.message, error);
            amended = true;
        }
        if let Some(summarizer) = &self.summarizer {
            verdict.narrative_summary = Some(self.summarize(summarizer.as_ref(), &verdict, &cancel).await);
            amended = true;
        }
        if verdict.overall == OverallStatus::Unsafe {
            if let Some(blocker) = &self.blocker {
                let status = self.apply_block(blocker.as_ref(), target, &verdict).await;
                verdict.block_status = Some(status);
                if status.is_effective() {
                    send_write(&writes, PendingWrite::Blocked(verdict.clone(), options.user_id.clone()));
                }
                amended = true;
            }
        }
        if amended {
            send_write(&writes, PendingWrite::Verdict(verdict.clone()));
        }
        drop(writes);

        let persisted = tokio::select! {
            biased;
            result = writer => Some(result),
            _ = cancel.cancelled() => None,
        };
        timer.abort();

        match persisted {
            Some(Ok(Ok(()))) => Outcome::Done(verdict),
            Some(Ok(Err(e))) => Outcome::PersistFailed { reason: e.to_string(), best_effort: verdict },
            Some(Err(join_error)) => Outcome::PersistFailed {
                reason: format!("Persistence task failed: {}", join_error),
                best_effort: verdict,
            },
            None => {
                warn!(url = %target.normalized, "Deadline reached before persistence confirmed, writes continue in background");
                Outcome::Done(verdict)
            }
        }
    }

    fn build_verdict(
        &self,
        target: &TargetUrl,
        assessment: DomainAssessment,
        reputation: ReputationVerdict,
        attempts: u32,
    ) -> TrustVerdict {
        let (overall, message) = fuse(assessment.classification, reputation.status, self.policy);
        TrustVerdict {
            id: target.id.clone(),
            url: target.normalized.clone(),
            domain: target.domain.clone(),
            overall,
            message,
            domain_assessment: assessment,
            reputation_verdict: Some(reputation),
            block_status: None,
            narrative_summary: None,
            attempts,
            evaluated_at: Utc::now(),
        }
    }

    async fn summarize(
        &self,
        summarizer: &dyn NarrativeSummarizer,
        verdict: &TrustVerdict,
        cancel: &CancellationToken,
    ) -> String {
        let report = json!({
            "url": verdict.url,
            "overall": verdict.overall,
            "message": verdict.message,
            "domain_assessment": verdict.domain_assessment,
            "reputation": verdict.reputation_verdict,
        });

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TrustLensError::Timeout("deadline exceeded".into())),
            r = summarizer.summarize(&report) => r,
        };
        match result {
            Ok(summary) => summary,
            Err(e) => {
                warn!(provider = summarizer.provider_name(), error = %e, "Narrative summary failed");
                format!("Summary unavailable: {}", e)
            }
        }
    }

    /// Check the block registry first so each URL reaches the blocker once.
    /// The URL's host is blocked, not its registrable domain.
    async fn apply_block(
        &self,
        blocker: &dyn DomainBlocker,
        target: &TargetUrl,
        verdict: &TrustVerdict,
    ) -> BlockStatus {
        let host = target.block_host();
        match self.store.is_blocked(&verdict.id).await {
            Ok(true) => {
                debug!(host = %host, "Already in block registry");
                BlockStatus::AlreadyBlocked
            }
            Ok(false) => blocker.block(host).await,
            Err(e) => {
                warn!(host = %host, error = %e, "Block registry lookup failed");
                blocker.block(host).await
            }
        }
    }

    /// Writes are applied in order by one task so the last verdict sent is the
    /// one left in the store.
    fn spawn_writer(
        &self,
    ) -> (mpsc::UnboundedSender<PendingWrite>, JoinHandle<Result<(), TrustLensError>>) {
        let store = self.store.clone();
        let retry = RetryPolicy::persistence(self.config.persist_retries);
        let (tx, mut rx) = mpsc::unbounded_channel::<PendingWrite>();

        let handle = tokio::spawn(async move {
            let mut first_error: Option<TrustLensError> = None;
            while let Some(write) = rx.recv().await {
                let result = match &write {
                    PendingWrite::Verdict(verdict) => {
                        with_retry("persist_verdict", &retry, || store.put(verdict)).await
                    }
                    PendingWrite::Blocked(verdict, user_id) => {
                        with_retry("record_blocked", &retry, || {
                            store.record_blocked(verdict, user_id.as_deref())
                        })
                        .await
                    }
                };
                if let Err(e) = result {
                    warn!(error = %e, "Persistence write failed");
                    first_error.get_or_insert(e);
                }
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        });
        (tx, handle)
    }
}

fn send_write(writes: &mpsc::UnboundedSender<PendingWrite>, write: PendingWrite) {
    if writes.send(write).is_err() {
        warn!("Persistence writer stopped, verdict not recorded");
    }
}

fn invalid_url_verdict(url: &str, error: &TrustLensError) -> TrustVerdict {
    let raw = url.trim();
    TrustVerdict {
        id: UrlId::from_normalized(raw),
        url: raw.to_string(),
        domain: String::new(),
        overall: OverallStatus::Error,
        message: error.to_string(),
        domain_assessment: DomainAssessment::unavailable(raw),
        reputation_verdict: None,
        block_status: None,
        narrative_summary: None,
        attempts: 0,
        evaluated_at: Utc::now(),
    }
}
