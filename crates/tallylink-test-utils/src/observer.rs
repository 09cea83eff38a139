// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording log observer and fixed credentials.

use std::sync::Mutex;

use tallylink_core::{CredentialsProvider, LogLevel, LogObserver};

/// Captures every observer entry for later assertions.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|(l, message)| *l == level && message.contains(needle))
    }
}

impl LogObserver for RecordingObserver {
    fn on_log_entry(&self, level: LogLevel, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((level, message.to_string()));
    }
}

/// Credentials that are either fully registered or entirely absent.
#[derive(Debug, Clone, Copy)]
pub struct StaticTestCredentials {
    registered: bool,
}

impl StaticTestCredentials {
    pub fn registered() -> Self {
        Self { registered: true }
    }

    pub fn unregistered() -> Self {
        Self { registered: false }
    }
}

impl CredentialsProvider for StaticTestCredentials {
    fn agent_id(&self) -> Option<String> {
        self.registered.then(|| "agent-test".to_string())
    }

    fn shop_id(&self) -> Option<String> {
        self.registered.then(|| "shop-test".to_string())
    }

    fn cloud_url(&self) -> Option<String> {
        Some("http://cloud.test".to_string())
    }

    fn auth_header(&self) -> Option<String> {
        self.registered.then(|| "Bearer test-key".to_string())
    }
}
