// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job dispatch with at-most-once local execution.
//!
//! Every job passes the idempotency gate first: a job id that already has a
//! completed record is never run again, its stored outcome is replayed for
//! re-reporting instead. Outcomes, failures included, are persisted before
//! the caller gets them back.

use std::sync::Arc;

use tallylink_core::{
    AgentError, CompletedJob, ErrorKind, Job, JobOutcome, OfflineQueue, TargetConnector,
};
use tallylink_tally::TallyOperation;
use tracing::{debug, info, warn};

use crate::log::AgentLog;

/// Result of routing one job.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub job_id: String,
    pub outcome: JobOutcome,
    pub completed_at: String,
    /// True when the outcome came from an earlier run of the same job id.
    pub replayed: bool,
}

impl Execution {
    fn from_record(record: CompletedJob, replayed: bool) -> Self {
        Self {
            job_id: record.job_id,
            outcome: record.result,
            completed_at: record.completed_at,
            replayed,
        }
    }
}

pub struct JobRouter {
    connector: Arc<dyn TargetConnector>,
    queue: Arc<dyn OfflineQueue>,
    log: AgentLog,
}

impl JobRouter {
    pub fn new(
        connector: Arc<dyn TargetConnector>,
        queue: Arc<dyn OfflineQueue>,
        log: AgentLog,
    ) -> Self {
        Self {
            connector,
            queue,
            log,
        }
    }

    /// Execute a job, or replay its stored outcome if it already ran.
    ///
    /// Job-level failures come back as a failed [`JobOutcome`]. An `Err` means
    /// the queue itself could not be read or written.
    pub async fn execute(&self, job: &Job) -> Result<Execution, AgentError> {
        if let Some(existing) = self.replay(&job.id).await? {
            return Ok(existing);
        }

        self.queue.enqueue(job).await?;
        self.log
            .info(&format!("Processing job {} ({})", job.id, job.job_type));

        let outcome = self.run(job).await;
        if outcome.success {
            info!(job_id = %job.id, job_type = %job.job_type, "job succeeded");
        } else {
            self.log.warn(&format!(
                "Job {} failed: {}",
                job.id,
                outcome.error.as_deref().unwrap_or("unknown error")
            ));
        }

        self.record(&job.id, outcome).await
    }

    /// Resolve queue entries left pending by a process that died mid-job.
    ///
    /// An entry that already has a completed record only needs its status
    /// settled. One without is recorded as an `interrupted` failure so the
    /// cloud hears about it and a redelivery is not run a second time.
    /// Returns the number of entries marked interrupted.
    pub async fn recover_interrupted(&self) -> Result<usize, AgentError> {
        let pending = self.queue.get_pending_jobs().await?;
        let mut interrupted = 0;
        for entry in pending {
            if let Some(record) = self.queue.get_completed_job(&entry.job_id).await? {
                self.settle(&entry.job_id, record.result.success).await?;
                debug!(job_id = %entry.job_id, "settled queue entry for completed job");
                continue;
            }

            let outcome = JobOutcome::failed(
                ErrorKind::Interrupted,
                "agent stopped before the job finished; it was not retried",
            );
            self.queue.save_completed_job(&entry.job_id, &outcome).await?;
            self.queue.mark_failed(&entry.job_id).await?;
            self.log.warn(&format!(
                "Job {} was interrupted by a restart and marked failed",
                entry.job_id
            ));
            interrupted += 1;
        }
        Ok(interrupted)
    }

    async fn replay(&self, job_id: &str) -> Result<Option<Execution>, AgentError> {
        if !self.queue.is_job_processed(job_id).await? {
            return Ok(None);
        }
        let record = self.queue.get_completed_job(job_id).await?.ok_or_else(|| {
            AgentError::Internal(format!("job {job_id} is processed but has no stored outcome"))
        })?;
        self.log
            .info(&format!("Job {job_id} already processed, re-sending result"));
        Ok(Some(Execution::from_record(record, true)))
    }

    async fn run(&self, job: &Job) -> JobOutcome {
        let operation = match TallyOperation::from_job(&job.job_type, &job.payload) {
            Ok(operation) => operation,
            Err(e) => return JobOutcome::from_error(&e),
        };

        if !self.connector.is_available().await {
            return JobOutcome::from_error(&AgentError::TargetUnavailable(
                "Tally is not running or not reachable".into(),
            ));
        }

        match self.dispatch(&operation).await {
            Ok(data) => JobOutcome::succeeded(data),
            Err(e) => JobOutcome::from_error(&e),
        }
    }

    async fn dispatch(&self, operation: &TallyOperation) -> Result<serde_json::Value, AgentError> {
        let document = operation.build()?;
        let response = self.connector.send(&document).await?;
        operation.parse(&response)
    }

    async fn record(&self, job_id: &str, outcome: JobOutcome) -> Result<Execution, AgentError> {
        let inserted = self.queue.save_completed_job(job_id, &outcome).await?;
        self.settle(job_id, outcome.success).await?;

        let record = self.queue.get_completed_job(job_id).await?.ok_or_else(|| {
            AgentError::Internal(format!("outcome for job {job_id} vanished after save"))
        })?;
        if !inserted {
            warn!(job_id, "job already had a stored outcome; keeping the first one");
        }
        Ok(Execution::from_record(record, !inserted))
    }

    async fn settle(&self, job_id: &str, success: bool) -> Result<(), AgentError> {
        if success {
            self.queue.mark_synced(job_id).await
        } else {
            self.queue.mark_failed(job_id).await
        }
    }
}
