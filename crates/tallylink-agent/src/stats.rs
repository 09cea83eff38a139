// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local poll counters. Rebuilt from zero on every start.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PollStats {
    pub total_polls: u64,
    pub successful_polls: u64,
    pub failed_polls: u64,
    pub jobs_processed: u64,
    pub jobs_failed: u64,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    /// Message of the most recent cycle failure, cleared on success.
    pub last_error: Option<String>,
}

impl PollStats {
    pub(crate) fn record_attempt(&mut self) {
        self.total_polls += 1;
        self.last_poll_at = Some(Utc::now());
    }

    pub(crate) fn record_success(&mut self) {
        self.successful_polls += 1;
        self.consecutive_failures = 0;
        self.last_success_at = Some(Utc::now());
        self.last_error = None;
    }

    pub(crate) fn record_failure(&mut self, message: String) {
        self.failed_polls += 1;
        self.consecutive_failures += 1;
        self.last_error = Some(message);
    }

    pub(crate) fn record_job(&mut self, success: bool) {
        if success {
            self.jobs_processed += 1;
        } else {
            self.jobs_failed += 1;
        }
    }
}

/// Point-in-time view of the engine for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub running: bool,
    /// Set when credentials were rejected and polling stopped.
    pub halted: Option<String>,
    pub current_interval_secs: u64,
    #[serde(flatten)]
    pub stats: PollStats,
}
