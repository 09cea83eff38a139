// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection management: PRAGMA setup, migrations, and shutdown.
//!
//! Every read and write goes through the one `tokio_rusqlite::Connection`
//! held here, whose background thread serializes them. Do not open a second
//! connection for writes.

use std::path::Path;

use tallylink_core::AgentError;
use tracing::debug;

use crate::migrations::run_migrations;

/// Handle to the offline queue database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` and migrate it.
    ///
    /// `wal` selects WAL journaling; with `synchronous = FULL` every commit is
    /// on stable storage before the call returns.
    pub async fn open(path: &str, wal: bool) -> Result<Self, AgentError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(persistence)?;
        }

        // Schema work happens on a plain connection before the async one exists.
        let owned = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), AgentError> {
            let mut conn = rusqlite::Connection::open(&owned).map_err(persistence)?;
            let mode = if wal { "WAL" } else { "DELETE" };
            conn.pragma_update(None, "journal_mode", mode)
                .map_err(persistence)?;
            run_migrations(&mut conn)
        })
        .await
        .map_err(|e| AgentError::Internal(format!("migration task panicked: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(persistence)?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA synchronous = FULL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, wal, "offline queue database opened");
        Ok(Self { conn })
    }

    /// The serialized connection all queries go through.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Fold the WAL back into the main database file.
    pub async fn checkpoint(&self) -> Result<(), AgentError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoint and close the connection.
    pub async fn close(self) -> Result<(), AgentError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(persistence)
    }
}

/// Convert a tokio-rusqlite call error into [`AgentError::Persistence`].
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> AgentError {
    persistence(e)
}

fn persistence<E>(e: E) -> AgentError
where
    E: std::error::Error + Send + Sync + 'static,
{
    AgentError::Persistence {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_parent_dirs_and_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/queue.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table'
                     AND name IN ('offline_queue', 'completed_jobs') ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();
        assert_eq!(tables, vec!["completed_jobs", "offline_queue"]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn wal_mode_applied() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        let mode: String = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("twice.db");
        let path = path.to_str().unwrap();
        Database::open(path, true).await.unwrap().close().await.unwrap();
        Database::open(path, true).await.unwrap().close().await.unwrap();
    }
}
