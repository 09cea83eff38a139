// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Log observer hook for hosts that display agent activity.

use crate::types::LogLevel;

/// Receives human-readable log entries from the engine and router.
///
/// Called in addition to `tracing` events, so a host UI can show activity
/// without intercepting process output.
pub trait LogObserver: Send + Sync {
    fn on_log_entry(&self, level: LogLevel, message: &str);
}

/// Observer that drops every entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl LogObserver for NoopObserver {
    fn on_log_entry(&self, _level: LogLevel, _message: &str) {}
}
