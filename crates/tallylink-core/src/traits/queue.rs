// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline queue trait: durable queue and completion state.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CompletedJob, Job, JobOutcome, QueueEntry, QueueStats};

/// Durable, crash-safe record of queued jobs and their outcomes.
///
/// Every mutating call returns only after the change is flushed to stable
/// storage. Implementations own their persisted state exclusively.
#[async_trait]
pub trait OfflineQueue: PluginAdapter {
    /// Opens the backing store and applies migrations.
    async fn initialize(&self) -> Result<(), AgentError>;

    /// Checkpoints pending writes and releases the store. Later calls fail
    /// until the queue is initialized again; closing twice is a no-op.
    async fn close(&self) -> Result<(), AgentError>;

    /// Upserts a `pending` entry for the job.
    async fn enqueue(&self, job: &Job) -> Result<(), AgentError>;

    /// Pending entries, oldest first.
    async fn get_pending_jobs(&self) -> Result<Vec<QueueEntry>, AgentError>;

    async fn mark_synced(&self, job_id: &str) -> Result<(), AgentError>;

    /// Marks the entry failed and increments its retry count.
    async fn mark_failed(&self, job_id: &str) -> Result<(), AgentError>;

    /// Idempotency gate: true once a completed record exists for the id.
    async fn is_job_processed(&self, job_id: &str) -> Result<bool, AgentError>;

    async fn get_completed_job(&self, job_id: &str) -> Result<Option<CompletedJob>, AgentError>;

    /// Records an outcome with `reported = false`.
    ///
    /// Returns `false` when a record already existed; the stored record is
    /// left untouched in that case.
    async fn save_completed_job(
        &self,
        job_id: &str,
        result: &JobOutcome,
    ) -> Result<bool, AgentError>;

    async fn mark_reported(&self, job_id: &str) -> Result<(), AgentError>;

    /// Unreported completed jobs, oldest first, capped at `limit`.
    async fn get_unreported_jobs(&self, limit: usize) -> Result<Vec<CompletedJob>, AgentError>;

    async fn get_stats(&self) -> Result<QueueStats, AgentError>;

    /// Deletes `synced` entries older than `retention`. Completed records are kept.
    async fn cleanup(&self, retention: Duration) -> Result<u64, AgentError>;
}
