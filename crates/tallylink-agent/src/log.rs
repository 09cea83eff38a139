// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Forwards engine and router messages to both `tracing` and the host's
//! [`LogObserver`].

use std::sync::Arc;

use tallylink_core::{LogLevel, LogObserver, NoopObserver};

#[derive(Clone)]
pub struct AgentLog {
    observer: Arc<dyn LogObserver>,
}

impl AgentLog {
    pub fn new(observer: Arc<dyn LogObserver>) -> Self {
        Self { observer }
    }

    pub fn info(&self, message: &str) {
        tracing::info!("{message}");
        self.observer.on_log_entry(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!("{message}");
        self.observer.on_log_entry(LogLevel::Warning, message);
    }

    pub fn error(&self, message: &str) {
        tracing::error!("{message}");
        self.observer.on_log_entry(LogLevel::Error, message);
    }
}

impl Default for AgentLog {
    fn default() -> Self {
        Self::new(Arc::new(NoopObserver))
    }
}
