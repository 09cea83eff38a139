// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Poll loop between the cloud and the local Tally.
//!
//! [`SyncEngine`] runs one poll cycle at a time on a background task:
//! probe Tally, post status to the cloud, execute returned jobs through the
//! [`JobRouter`], report each outcome, then flush older unreported outcomes.
//! The next cycle is scheduled only after the current one finishes, using
//! the [`PollInterval`] as adjusted by that cycle.

use std::sync::Arc;
use std::time::Duration;

use tallylink_cloud::{
    AGENT_VERSION, AgentStatus, POLL_PATH, PollRequest, PollResponse, RESULT_PATH, ResultReport,
};
use tallylink_config::model::PollingConfig;
use tallylink_core::{
    AgentError, CloudClient, CredentialsProvider, JobOutcome, OfflineQueue, TargetConnector,
};
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::PollInterval;
use crate::log::AgentLog;
use crate::router::JobRouter;
use crate::stats::{EngineSnapshot, PollStats};

/// Lifecycle of the engine, published on a watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    Stopped,
    Running,
    /// Stopped because the cloud rejected the credentials. Persists until
    /// the next successful `start`.
    AuthenticationHalted(String),
}

impl EngineStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Collaborators the engine is wired with.
pub struct EngineParts {
    pub connector: Arc<dyn TargetConnector>,
    pub queue: Arc<dyn OfflineQueue>,
    pub cloud: Arc<dyn CloudClient>,
    pub credentials: Arc<dyn CredentialsProvider>,
    pub log: AgentLog,
}

struct CycleState {
    interval: PollInterval,
    stats: PollStats,
}

struct Inner {
    router: JobRouter,
    connector: Arc<dyn TargetConnector>,
    queue: Arc<dyn OfflineQueue>,
    cloud: Arc<dyn CloudClient>,
    credentials: Arc<dyn CredentialsProvider>,
    log: AgentLog,
    batch_size: usize,
    state: Mutex<CycleState>,
    /// Held for the duration of a cycle so cycles never overlap.
    cycle: Mutex<()>,
    cancel: Mutex<Option<CancellationToken>>,
    status: watch::Sender<EngineStatus>,
}

/// Cheaply cloneable handle to the poll loop.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

impl SyncEngine {
    pub fn new(config: &PollingConfig, parts: EngineParts) -> Self {
        let router = JobRouter::new(
            Arc::clone(&parts.connector),
            Arc::clone(&parts.queue),
            parts.log.clone(),
        );
        let (status, _) = watch::channel(EngineStatus::Stopped);
        Self {
            inner: Arc::new(Inner {
                router,
                connector: parts.connector,
                queue: parts.queue,
                cloud: parts.cloud,
                credentials: parts.credentials,
                log: parts.log,
                batch_size: config.unreported_batch_size.max(1),
                state: Mutex::new(CycleState {
                    interval: PollInterval::new(config),
                    stats: PollStats::default(),
                }),
                cycle: Mutex::new(()),
                cancel: Mutex::new(None),
                status,
            }),
        }
    }

    pub fn router(&self) -> &JobRouter {
        &self.inner.router
    }

    /// Start polling. Returns `false` without doing anything when already
    /// running or when no credentials are configured.
    ///
    /// Waits for a cycle left over from a previous run to finish, then
    /// resolves interrupted jobs before the first poll, which runs
    /// immediately.
    pub async fn start(&self) -> Result<bool, AgentError> {
        // Lock order is cycle, then cancel, as in `poll_once`.
        let _cycle = self.inner.cycle.lock().await;
        let mut cancel = self.inner.cancel.lock().await;
        if self.inner.status.borrow().is_running() {
            debug!("sync engine already running");
            return Ok(false);
        }
        if !self.inner.credentials.is_registered() {
            self.inner
                .log
                .error("Agent is not registered; polling not started");
            return Ok(false);
        }

        let interrupted = self.inner.router.recover_interrupted().await?;
        if interrupted > 0 {
            info!(count = interrupted, "recorded interrupted jobs from previous run");
        }

        let token = CancellationToken::new();
        *cancel = Some(token.clone());
        self.inner.status.send_replace(EngineStatus::Running);
        self.inner.log.info("Sync engine started");

        let engine = self.clone();
        tokio::spawn(async move { engine.run(token).await });
        Ok(true)
    }

    /// Stop polling and cancel the scheduled cycle. An in-flight cycle runs
    /// to completion but nothing is scheduled after it. Idempotent.
    pub async fn stop(&self) {
        if let Some(token) = self.inner.cancel.lock().await.take() {
            token.cancel();
        }
        let was_running = self.inner.status.send_if_modified(|status| {
            if status.is_running() {
                *status = EngineStatus::Stopped;
                true
            } else {
                false
            }
        });
        if was_running {
            self.inner.log.info("Sync engine stopped");
        }
    }

    pub fn status(&self) -> EngineStatus {
        self.inner.status.borrow().clone()
    }

    /// Watch channel carrying every status transition.
    pub fn subscribe(&self) -> watch::Receiver<EngineStatus> {
        self.inner.status.subscribe()
    }

    pub async fn stats(&self) -> EngineSnapshot {
        let state = self.inner.state.lock().await;
        let status = self.status();
        EngineSnapshot {
            running: status.is_running(),
            halted: match status {
                EngineStatus::AuthenticationHalted(message) => Some(message),
                _ => None,
            },
            current_interval_secs: state.interval.current().as_secs(),
            stats: state.stats.clone(),
        }
    }

    pub async fn current_interval(&self) -> Duration {
        self.inner.state.lock().await.interval.current()
    }

    async fn run(self, token: CancellationToken) {
        loop {
            if token.is_cancelled() {
                break;
            }
            let _ = self.poll_cycle(Some(&token)).await;
            if token.is_cancelled() || !self.status().is_running() {
                break;
            }

            let delay = self.current_interval().await;
            debug!(interval_secs = delay.as_secs(), "next poll scheduled");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = token.cancelled() => break,
            }
        }
        debug!("poll loop exited");
    }

    /// Run one poll cycle and apply its effect on stats and interval.
    ///
    /// Returns the number of jobs the cloud handed out.
    pub async fn poll_once(&self) -> Result<usize, AgentError> {
        self.poll_cycle(None).await
    }

    /// `owner` is the token of the run that scheduled this cycle, if any.
    async fn poll_cycle(&self, owner: Option<&CancellationToken>) -> Result<usize, AgentError> {
        let _cycle = self.inner.cycle.lock().await;
        self.inner.state.lock().await.stats.record_attempt();

        match self.cycle().await {
            Ok(jobs) => {
                let mut state = self.inner.state.lock().await;
                state.stats.record_success();
                state.interval.relax();
                Ok(jobs)
            }
            Err(e) => {
                self.on_cycle_failure(&e, owner).await;
                Err(e)
            }
        }
    }

    async fn on_cycle_failure(&self, err: &AgentError, owner: Option<&CancellationToken>) {
        let mut state = self.inner.state.lock().await;
        state.stats.record_failure(err.to_string());

        if err.is_fatal_to_engine() {
            drop(state);
            let mut cancel = self.inner.cancel.lock().await;
            // A cycle whose run was already stopped must not halt a newer run.
            if owner.is_some_and(CancellationToken::is_cancelled) {
                warn!(error = %err, "authentication failed in a cycle from a stopped run");
                return;
            }
            self.inner
                .log
                .error(&format!("Authentication failed, polling stopped: {err}"));
            if let Some(token) = cancel.take() {
                token.cancel();
            }
            self.inner
                .status
                .send_replace(EngineStatus::AuthenticationHalted(err.to_string()));
            return;
        }

        if err.is_local_fault() {
            self.inner
                .log
                .error(&format!("Offline queue failure, needs attention: {err}"));
        } else {
            self.inner.log.warn(&format!("Poll failed: {err}"));
        }

        if matches!(err, AgentError::RateLimited(_)) {
            state.interval.on_rate_limited();
        }
        let streak = state.stats.consecutive_failures;
        state.interval.on_failure(streak);
        if state.interval.is_elevated() {
            info!(
                interval_secs = state.interval.current().as_secs(),
                consecutive_failures = streak,
                "backing off poll interval"
            );
        }
    }

    async fn cycle(&self) -> Result<usize, AgentError> {
        let inner = &self.inner;
        let tally_running = inner.connector.is_available().await;
        let (tally_version, tally_company) = if tally_running {
            (inner.connector.edition().await, inner.connector.company_name().await)
        } else {
            (None, None)
        };

        let request = PollRequest {
            agent_id: inner.credentials.agent_id(),
            shop_id: inner.credentials.shop_id(),
            status: AgentStatus::from_liveness(tally_running),
            tally_version,
            tally_company,
            agent_version: AGENT_VERSION.to_string(),
            queue_stats: inner.queue.get_stats().await?,
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| AgentError::Internal(format!("failed to encode poll request: {e}")))?;

        let response = inner.cloud.post_json(POLL_PATH, &body).await?;
        let response: PollResponse = if response.is_null() {
            PollResponse::default()
        } else {
            serde_json::from_value(response).map_err(|e| AgentError::Transport {
                message: format!("invalid poll response: {e}"),
                source: Some(Box::new(e)),
            })?
        };

        if let Some(secs) = response.poll_interval {
            inner.state.lock().await.interval.adopt_hint(secs);
        }

        let jobs = response.jobs.len();
        if jobs > 0 {
            inner.log.info(&format!("Received {jobs} job(s)"));
        }
        for job in &response.jobs {
            let execution = inner.router.execute(job).await?;
            if !execution.replayed {
                inner
                    .state
                    .lock()
                    .await
                    .stats
                    .record_job(execution.outcome.success);
            }
            self.report(&execution.job_id, &execution.outcome, &execution.completed_at)
                .await;
        }

        self.flush_unreported().await?;
        Ok(jobs)
    }

    async fn flush_unreported(&self) -> Result<(), AgentError> {
        let pending = self
            .inner
            .queue
            .get_unreported_jobs(self.inner.batch_size)
            .await?;
        if pending.is_empty() {
            return Ok(());
        }
        debug!(count = pending.len(), "re-sending unreported results");
        for record in pending {
            self.report(&record.job_id, &record.result, &record.completed_at)
                .await;
        }
        Ok(())
    }

    /// Best-effort delivery of one outcome. A failure leaves the record
    /// unreported for the next cycle's flush.
    async fn report(&self, job_id: &str, outcome: &JobOutcome, completed_at: &str) -> bool {
        let report = ResultReport::new(
            self.inner.credentials.agent_id(),
            job_id,
            outcome,
            completed_at,
        );
        let body = match serde_json::to_value(&report) {
            Ok(body) => body,
            Err(e) => {
                warn!(job_id, error = %e, "failed to encode result report");
                return false;
            }
        };

        if let Err(e) = self.inner.cloud.post_json(RESULT_PATH, &body).await {
            warn!(job_id, error = %e, "failed to report result, will retry next poll");
            return false;
        }
        match self.inner.queue.mark_reported(job_id).await {
            Ok(()) => {
                debug!(job_id, "result reported");
                true
            }
            Err(e) => {
                self.inner.log.error(&format!(
                    "Result for job {job_id} was delivered but could not be marked reported: {e}"
                ));
                false
            }
        }
    }
}
