// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`OfflineQueue`] trait.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use tallylink_config::model::StorageConfig;
use tallylink_core::{
    AdapterType, AgentError, CompletedJob, HealthStatus, Job, JobOutcome, OfflineQueue,
    PluginAdapter, QueueEntry, QueueStats,
};

use crate::database::{Database, map_tr_err};
use crate::queries::{completed, queue};

/// SQLite-backed offline queue.
///
/// The database is opened by [`OfflineQueue::initialize`] and released by
/// [`OfflineQueue::close`]; every other call fails with a persistence error
/// outside that window.
pub struct SqliteQueue {
    config: StorageConfig,
    db: RwLock<Option<Database>>,
}

impl SqliteQueue {
    /// Create a queue for the configured database path without opening it.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: RwLock::new(None),
        }
    }

    /// Shorthand for a WAL-mode queue at `path`.
    pub fn at_path(path: impl Into<String>) -> Self {
        Self::new(StorageConfig {
            database_path: path.into(),
            wal_mode: true,
        })
    }

    pub fn database_path(&self) -> &str {
        &self.config.database_path
    }

    /// Pending entry for a job, whatever its status.
    pub async fn get_entry(&self, job_id: &str) -> Result<Option<QueueEntry>, AgentError> {
        queue::get(&self.db()?, job_id).await
    }

    /// Handle to the open database. Handles share one connection.
    fn current(&self) -> Option<Database> {
        self.db
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn db(&self) -> Result<Database, AgentError> {
        self.current().ok_or_else(|| AgentError::Persistence {
            source: "offline queue is not open; call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteQueue {
    fn name(&self) -> &str {
        "sqlite-queue"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Queue
    }

    async fn health_check(&self) -> Result<HealthStatus, AgentError> {
        let Some(db) = self.current() else {
            return Ok(HealthStatus::Unhealthy("not open".into()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("SELECT 1;") })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AgentError> {
        if let Some(db) = self.current() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl OfflineQueue for SqliteQueue {
    async fn initialize(&self) -> Result<(), AgentError> {
        if self.current().is_some() {
            return Err(AgentError::Persistence {
                source: "offline queue already initialized".into(),
            });
        }
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        {
            let mut slot = self.db.write().unwrap_or_else(PoisonError::into_inner);
            if slot.is_some() {
                return Err(AgentError::Persistence {
                    source: "offline queue already initialized".into(),
                });
            }
            *slot = Some(db);
        }
        info!(path = %self.config.database_path, "offline queue ready");
        Ok(())
    }

    async fn close(&self) -> Result<(), AgentError> {
        let db = self
            .db
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(db) = db {
            db.close().await?;
            debug!("offline queue checkpointed and closed");
        }
        Ok(())
    }

    async fn enqueue(&self, job: &Job) -> Result<(), AgentError> {
        queue::enqueue(&self.db()?, job).await?;
        debug!(job_id = %job.id, job_type = %job.job_type, "job enqueued");
        Ok(())
    }

    async fn get_pending_jobs(&self) -> Result<Vec<QueueEntry>, AgentError> {
        queue::pending(&self.db()?).await
    }

    async fn mark_synced(&self, job_id: &str) -> Result<(), AgentError> {
        queue::mark_synced(&self.db()?, job_id).await
    }

    async fn mark_failed(&self, job_id: &str) -> Result<(), AgentError> {
        queue::mark_failed(&self.db()?, job_id).await
    }

    async fn is_job_processed(&self, job_id: &str) -> Result<bool, AgentError> {
        completed::exists(&self.db()?, job_id).await
    }

    async fn get_completed_job(&self, job_id: &str) -> Result<Option<CompletedJob>, AgentError> {
        completed::get(&self.db()?, job_id).await
    }

    async fn save_completed_job(
        &self,
        job_id: &str,
        result: &JobOutcome,
    ) -> Result<bool, AgentError> {
        let inserted = completed::insert_if_absent(&self.db()?, job_id, result).await?;
        if !inserted {
            debug!(job_id, "completed record already present, left unchanged");
        }
        Ok(inserted)
    }

    async fn mark_reported(&self, job_id: &str) -> Result<(), AgentError> {
        completed::mark_reported(&self.db()?, job_id).await
    }

    async fn get_unreported_jobs(&self, limit: usize) -> Result<Vec<CompletedJob>, AgentError> {
        completed::unreported(&self.db()?, limit).await
    }

    async fn get_stats(&self) -> Result<QueueStats, AgentError> {
        let db = self.db()?;
        let (pending, synced, failed) = queue::status_counts(&db).await?;
        let unreported = completed::unreported_count(&db).await?;
        Ok(QueueStats {
            pending,
            synced,
            failed,
            unreported,
        })
    }

    async fn cleanup(&self, retention: Duration) -> Result<u64, AgentError> {
        let retention = chrono::Duration::from_std(retention)
            .map_err(|e| AgentError::Internal(format!("retention out of range: {e}")))?;
        let cutoff = tallylink_core::time::format_timestamp(chrono::Utc::now() - retention);
        let deleted = queue::delete_synced_before(&self.db()?, cutoff).await?;
        if deleted > 0 {
            info!(deleted, "removed synced queue entries past retention");
        }
        Ok(deleted)
    }
}
