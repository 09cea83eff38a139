// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queries over `completed_jobs`, the idempotency ledger.

use rusqlite::{OptionalExtension, Row, params};
use tallylink_core::{AgentError, CompletedJob, JobOutcome};

use crate::database::{Database, map_tr_err};
use crate::queries::queue::text_conversion;

fn completed_from_row(row: &Row<'_>) -> Result<CompletedJob, rusqlite::Error> {
    let result: String = row.get(1)?;
    Ok(CompletedJob {
        job_id: row.get(0)?,
        result: serde_json::from_str(&result).map_err(|e| text_conversion(1, e))?,
        completed_at: row.get(2)?,
        reported: row.get(3)?,
    })
}

pub async fn exists(db: &Database, job_id: &str) -> Result<bool, AgentError> {
    let job_id = job_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM completed_jobs WHERE job_id = ?1)",
                params![job_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, job_id: &str) -> Result<Option<CompletedJob>, AgentError> {
    let job_id = job_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<CompletedJob>, rusqlite::Error> {
            conn.query_row(
                "SELECT job_id, result, completed_at, reported
                 FROM completed_jobs WHERE job_id = ?1",
                params![job_id],
                completed_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert an outcome unless one is already recorded. Returns whether a row
/// was written.
pub async fn insert_if_absent(
    db: &Database,
    job_id: &str,
    result: &JobOutcome,
) -> Result<bool, AgentError> {
    let job_id = job_id.to_string();
    let result =
        serde_json::to_string(result).map_err(|e| AgentError::Internal(e.to_string()))?;
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let inserted = conn.execute(
                "INSERT INTO completed_jobs (job_id, result, reported)
                 VALUES (?1, ?2, 0)
                 ON CONFLICT(job_id) DO NOTHING",
                params![job_id, result],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn mark_reported(db: &Database, job_id: &str) -> Result<(), AgentError> {
    let job_id = job_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE completed_jobs SET reported = 1 WHERE job_id = ?1",
                params![job_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Oldest unreported outcomes first.
pub async fn unreported(db: &Database, limit: usize) -> Result<Vec<CompletedJob>, AgentError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<CompletedJob>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT job_id, result, completed_at, reported
                 FROM completed_jobs
                 WHERE reported = 0
                 ORDER BY completed_at ASC, id ASC
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], completed_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn unreported_count(db: &Database) -> Result<u64, AgentError> {
    db.connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM completed_jobs WHERE reported = 0",
                [],
                |row| row.get(0),
            )
        })
        .await
        .map(|count| count as u64)
        .map_err(map_tr_err)
}
