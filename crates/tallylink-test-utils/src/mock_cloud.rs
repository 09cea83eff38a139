// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock cloud API with scripted poll replies and captured result reports.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::{Mutex, watch};

use tallylink_cloud::{POLL_PATH, RESULT_PATH};
use tallylink_core::{AgentError, CloudClient};

/// One scripted answer to a poll.
#[derive(Debug, Clone)]
pub enum CloudReply {
    Json(Value),
    Unauthorized,
    RateLimited,
    Unreachable,
}

impl CloudReply {
    /// Poll reply carrying the given jobs.
    pub fn jobs(jobs: Value) -> Self {
        Self::Json(json!({ "jobs": jobs }))
    }

    fn into_result(self) -> Result<Value, AgentError> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Unauthorized => Err(AgentError::Authentication("401 Unauthorized".into())),
            Self::RateLimited => Err(AgentError::RateLimited("429 Too Many Requests".into())),
            Self::Unreachable => Err(AgentError::transport("connection reset")),
        }
    }
}

/// Polls pop the next scripted [`CloudReply`], defaulting to an empty
/// response once the script runs out. Result reports are recorded unless
/// report failures are switched on.
pub struct MockCloud {
    replies: Mutex<VecDeque<CloudReply>>,
    polls: Mutex<Vec<Value>>,
    reports: Mutex<Vec<Value>>,
    report_attempts: AtomicUsize,
    fail_reports: AtomicBool,
    /// `true` while poll replies are held back.
    poll_gate: watch::Sender<bool>,
}

impl Default for MockCloud {
    fn default() -> Self {
        Self {
            replies: Mutex::default(),
            polls: Mutex::default(),
            reports: Mutex::default(),
            report_attempts: AtomicUsize::new(0),
            fail_reports: AtomicBool::new(false),
            poll_gate: watch::channel(false).0,
        }
    }
}

impl MockCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record following polls but withhold their replies until
    /// [`release_polls`](Self::release_polls).
    pub fn hold_polls(&self) {
        self.poll_gate.send_replace(true);
    }

    pub fn release_polls(&self) {
        self.poll_gate.send_replace(false);
    }

    pub async fn push_reply(&self, reply: CloudReply) {
        self.replies.lock().await.push_back(reply);
    }

    pub fn set_fail_reports(&self, fail: bool) {
        self.fail_reports.store(fail, Ordering::SeqCst);
    }

    /// Bodies of every poll request received.
    pub async fn polls(&self) -> Vec<Value> {
        self.polls.lock().await.clone()
    }

    pub async fn poll_count(&self) -> usize {
        self.polls.lock().await.len()
    }

    /// Result reports the cloud accepted.
    pub async fn reports(&self) -> Vec<Value> {
        self.reports.lock().await.clone()
    }

    /// Accepted reports for one job id.
    pub async fn reports_for(&self, job_id: &str) -> Vec<Value> {
        self.reports
            .lock()
            .await
            .iter()
            .filter(|r| r["job_id"] == job_id)
            .cloned()
            .collect()
    }

    pub fn report_attempts(&self) -> usize {
        self.report_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CloudClient for MockCloud {
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, AgentError> {
        match path {
            POLL_PATH => {
                self.polls.lock().await.push(body.clone());
                let mut gate = self.poll_gate.subscribe();
                let _ = gate.wait_for(|held| !held).await;
                let reply = self
                    .replies
                    .lock()
                    .await
                    .pop_front()
                    .unwrap_or(CloudReply::Json(json!({})));
                reply.into_result()
            }
            RESULT_PATH => {
                self.report_attempts.fetch_add(1, Ordering::SeqCst);
                if self.fail_reports.load(Ordering::SeqCst) {
                    return Err(AgentError::transport("report endpoint unreachable"));
                }
                self.reports.lock().await.push(body.clone());
                Ok(json!({"ok": true}))
            }
            other => Err(AgentError::transport(format!("mock cloud has no route {other}"))),
        }
    }
}
