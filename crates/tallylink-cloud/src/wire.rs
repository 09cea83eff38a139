// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON bodies exchanged with the cloud.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tallylink_core::{ErrorKind, Job, JobOutcome, QueueStats};
use tracing::warn;

/// Agent status derived from the target liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    TallyOffline,
}

impl AgentStatus {
    pub fn from_liveness(tally_running: bool) -> Self {
        if tally_running {
            Self::Idle
        } else {
            Self::TallyOffline
        }
    }
}

/// Status and telemetry sent on every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollRequest {
    pub agent_id: Option<String>,
    pub shop_id: Option<String>,
    pub status: AgentStatus,
    pub tally_version: Option<String>,
    pub tally_company: Option<String>,
    pub agent_version: String,
    pub queue_stats: QueueStats,
}

/// The cloud's answer to a poll.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PollResponse {
    /// Advisory poll interval in seconds. Fractions round up; anything
    /// that is not a positive number is ignored.
    #[serde(default, deserialize_with = "lenient_interval")]
    pub poll_interval: Option<u64>,
    #[serde(default, deserialize_with = "lenient_jobs")]
    pub jobs: Vec<Job>,
}

fn lenient_interval<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    let secs = match &raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match secs.filter(|v| v.is_finite() && *v > 0.0) {
        // Saturating cast; the interval policy clamps to its bounds anyway.
        Some(v) => Ok(Some(v.ceil() as u64)),
        None => {
            warn!(poll_interval = ?raw, "ignoring unusable poll interval hint");
            Ok(None)
        }
    }
}

/// A job entry that is not `{id, type, payload}` is dropped with a warning
/// instead of failing the whole poll. Numeric ids are taken as their
/// decimal text.
fn lenient_jobs<'de, D>(deserializer: D) -> Result<Vec<Job>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|mut value| {
            if let Some(id) = value.get_mut("id")
                && id.is_number()
            {
                let text = id.to_string();
                *id = Value::String(text);
            }
            let raw_id = value.get("id").cloned().unwrap_or(Value::Null);
            match serde_json::from_value::<Job>(value) {
                Ok(job) => Some(job),
                Err(e) => {
                    warn!(job_id = %raw_id, error = %e, "dropping malformed job from poll response");
                    None
                }
            }
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Completed,
    Failed,
}

/// Outcome of one job, sent to the result endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultReport {
    pub agent_id: Option<String>,
    pub job_id: String,
    pub status: ReportStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub error_type: Option<ErrorKind>,
    pub completed_at: String,
}

impl ResultReport {
    pub fn new(
        agent_id: Option<String>,
        job_id: impl Into<String>,
        outcome: &JobOutcome,
        completed_at: impl Into<String>,
    ) -> Self {
        Self {
            agent_id,
            job_id: job_id.into(),
            status: if outcome.success {
                ReportStatus::Completed
            } else {
                ReportStatus::Failed
            },
            result: outcome.data.clone(),
            error: outcome.error.clone(),
            error_type: outcome.error_kind,
            completed_at: completed_at.into(),
        }
    }
}
