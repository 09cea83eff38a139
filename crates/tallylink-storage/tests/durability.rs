// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Restart behaviour of the offline queue.

use serde_json::json;
use tallylink_core::{ErrorKind, Job, JobOutcome, JobType, OfflineQueue};
use tallylink_storage::SqliteQueue;
use tempfile::tempdir;

fn ledger_job(id: &str) -> Job {
    Job {
        id: id.to_string(),
        job_type: JobType::LedgerCreate,
        payload: json!({"name": "Acme & Co"}),
    }
}

/// An outcome saved right before a crash is still waiting to be reported
/// after the process comes back.
#[tokio::test]
async fn saved_outcome_survives_crash_before_report() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("queue.db").to_string_lossy().into_owned();

    {
        let queue = SqliteQueue::at_path(&path);
        queue.initialize().await.unwrap();
        queue.enqueue(&ledger_job("J1")).await.unwrap();
        let outcome = JobOutcome::succeeded(json!({"created": true, "masterId": "101"}));
        assert!(queue.save_completed_job("J1", &outcome).await.unwrap());
        // Dropped without close(): no checkpoint, no report.
    }

    let queue = SqliteQueue::at_path(&path);
    queue.initialize().await.unwrap();

    let unreported = queue.get_unreported_jobs(50).await.unwrap();
    assert_eq!(unreported.len(), 1);
    assert_eq!(unreported[0].job_id, "J1");
    assert_eq!(
        unreported[0].result.data,
        Some(json!({"created": true, "masterId": "101"}))
    );
    assert!(queue.is_job_processed("J1").await.unwrap());
    queue.close().await.unwrap();
}

#[tokio::test]
async fn pending_order_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("queue.db").to_string_lossy().into_owned();

    {
        let queue = SqliteQueue::at_path(&path);
        queue.initialize().await.unwrap();
        for id in ["A", "B", "C"] {
            queue.enqueue(&ledger_job(id)).await.unwrap();
        }
        queue.close().await.unwrap();
    }

    let queue = SqliteQueue::at_path(&path);
    queue.initialize().await.unwrap();
    let ids: Vec<String> = queue
        .get_pending_jobs()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.job_id)
        .collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn failure_outcomes_are_recorded_too() {
    let dir = tempdir().unwrap();
    let queue = SqliteQueue::at_path(dir.path().join("queue.db").to_string_lossy());
    queue.initialize().await.unwrap();

    let outcome = JobOutcome::failed(ErrorKind::TallyUnavailable, "Tally is not running");
    queue.save_completed_job("J2", &outcome).await.unwrap();

    let stored = queue.get_completed_job("J2").await.unwrap().unwrap();
    assert!(!stored.result.success);
    assert_eq!(stored.result.error_kind, Some(ErrorKind::TallyUnavailable));
    assert!(!stored.reported);
}
