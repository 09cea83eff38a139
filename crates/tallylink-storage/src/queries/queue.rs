// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queries over `offline_queue`.

use rusqlite::{OptionalExtension, Row, params};
use tallylink_core::{AgentError, Job, JobType, QueueEntry, QueueStatus};

use crate::database::{Database, map_tr_err};

const ENTRY_COLUMNS: &str =
    "job_id, job_type, payload, status, retry_count, created_at, synced_at";

fn entry_from_row(row: &Row<'_>) -> Result<QueueEntry, rusqlite::Error> {
    let job_type: String = row.get(1)?;
    let payload: String = row.get(2)?;
    let status: String = row.get(3)?;
    Ok(QueueEntry {
        job_id: row.get(0)?,
        job_type: JobType::from(job_type),
        payload: serde_json::from_str(&payload).map_err(|e| text_conversion(2, e))?,
        status: status
            .parse::<QueueStatus>()
            .map_err(|e| text_conversion(3, e))?,
        retry_count: row.get(4)?,
        created_at: row.get(5)?,
        synced_at: row.get(6)?,
    })
}

pub(crate) fn text_conversion<E>(column: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

/// Upsert a pending entry.
///
/// A redelivered job keeps its original `created_at` and retry count, so it
/// does not jump the queue.
pub async fn enqueue(db: &Database, job: &Job) -> Result<(), AgentError> {
    let job_id = job.id.clone();
    let job_type = job.job_type.to_string();
    let payload = serde_json::to_string(&job.payload)
        .map_err(|e| AgentError::InvalidPayload(e.to_string()))?;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO offline_queue (job_id, job_type, payload, status)
                 VALUES (?1, ?2, ?3, 'pending')
                 ON CONFLICT(job_id) DO UPDATE SET
                     job_type = excluded.job_type,
                     payload = excluded.payload,
                     status = 'pending',
                     synced_at = NULL",
                params![job_id, job_type, payload],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Pending entries in arrival order.
pub async fn pending(db: &Database) -> Result<Vec<QueueEntry>, AgentError> {
    db.connection()
        .call(|conn| -> Result<Vec<QueueEntry>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM offline_queue
                 WHERE status = 'pending'
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map([], entry_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, job_id: &str) -> Result<Option<QueueEntry>, AgentError> {
    let job_id = job_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<QueueEntry>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM offline_queue WHERE job_id = ?1"),
                params![job_id],
                entry_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn mark_synced(db: &Database, job_id: &str) -> Result<(), AgentError> {
    let job_id = job_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE offline_queue SET status = 'synced',
                 synced_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE job_id = ?1",
                params![job_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark an entry failed, counting the attempt.
pub async fn mark_failed(db: &Database, job_id: &str) -> Result<(), AgentError> {
    let job_id = job_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE offline_queue SET status = 'failed',
                 retry_count = retry_count + 1
                 WHERE job_id = ?1",
                params![job_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Counts per status as `(pending, synced, failed)`.
pub async fn status_counts(db: &Database) -> Result<(u64, u64, u64), AgentError> {
    db.connection()
        .call(|conn| -> Result<(u64, u64, u64), rusqlite::Error> {
            let mut stmt =
                conn.prepare("SELECT status, COUNT(*) FROM offline_queue GROUP BY status")?;
            let mut counts = (0, 0, 0);
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (status, count) = row?;
                let count = count as u64;
                match status.as_str() {
                    "pending" => counts.0 = count,
                    "synced" => counts.1 = count,
                    "failed" => counts.2 = count,
                    _ => {}
                }
            }
            Ok(counts)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete synced entries whose `synced_at` is before `cutoff`.
pub async fn delete_synced_before(db: &Database, cutoff: String) -> Result<u64, AgentError> {
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let deleted = conn.execute(
                "DELETE FROM offline_queue WHERE status = 'synced' AND synced_at < ?1",
                params![cutoff],
            )?;
            Ok(deleted as u64)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
        (db, dir)
    }

    fn job(id: &str) -> Job {
        Job {
            id: id.to_string(),
            job_type: JobType::LedgerRead,
            payload: json!({"n": id}),
        }
    }

    #[tokio::test]
    async fn pending_preserves_arrival_order() {
        let (db, _dir) = setup_db().await;
        for id in ["A", "B", "C"] {
            enqueue(&db, &job(id)).await.unwrap();
        }
        let ids: Vec<String> = pending(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.job_id)
            .collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn enqueue_is_an_upsert() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, &job("A")).await.unwrap();
        enqueue(&db, &job("B")).await.unwrap();
        mark_failed(&db, "A").await.unwrap();

        let mut again = job("A");
        again.payload = json!({"n": "A2"});
        enqueue(&db, &again).await.unwrap();

        let entries = pending(&db).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].job_id, "A", "redelivery keeps its place");
        assert_eq!(entries[0].payload, json!({"n": "A2"}));
        assert_eq!(entries[0].retry_count, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_failed_increments_retry_count() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, &job("A")).await.unwrap();
        mark_failed(&db, "A").await.unwrap();
        mark_failed(&db, "A").await.unwrap();

        let entry = get(&db, "A").await.unwrap().unwrap();
        assert_eq!(entry.status, QueueStatus::Failed);
        assert_eq!(entry.retry_count, 2);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_synced_stamps_time() {
        let (db, _dir) = setup_db().await;
        enqueue(&db, &job("A")).await.unwrap();
        mark_synced(&db, "A").await.unwrap();

        let entry = get(&db, "A").await.unwrap().unwrap();
        assert_eq!(entry.status, QueueStatus::Synced);
        assert!(entry.synced_at.is_some());
        assert!(pending(&db).await.unwrap().is_empty());
        assert_eq!(status_counts(&db).await.unwrap(), (0, 1, 0));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_job_is_none() {
        let (db, _dir) = setup_db().await;
        assert!(get(&db, "missing").await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
