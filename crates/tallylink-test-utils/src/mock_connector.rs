// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock Tally connector for deterministic testing.
//!
//! `MockConnector` implements `TargetConnector` with switchable availability,
//! scripted responses, captured request documents, and a gate that holds
//! `send()` open to simulate a slow Tally.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};

use tallylink_core::{AdapterType, AgentError, HealthStatus, PluginAdapter, TargetConnector};

use crate::CREATED_RESPONSE;

/// A scripted stand-in for a running Tally.
///
/// `send()` pops the next scripted reply; once the script is empty it
/// answers with [`CREATED_RESPONSE`].
pub struct MockConnector {
    available: AtomicBool,
    replies: Mutex<VecDeque<Result<String, String>>>,
    sent: Mutex<Vec<String>>,
    /// `true` while sends are held.
    gate: watch::Sender<bool>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            replies: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            gate: watch::channel(false).0,
        }
    }

    pub fn unavailable() -> Self {
        let connector = Self::new();
        connector.set_available(false);
        connector
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Queue a response body for the next `send()`.
    pub async fn push_response(&self, body: impl Into<String>) {
        self.replies.lock().await.push_back(Ok(body.into()));
    }

    /// Queue a transport failure for the next `send()`.
    pub async fn push_failure(&self, message: impl Into<String>) {
        self.replies.lock().await.push_back(Err(message.into()));
    }

    /// Documents passed to `send()`, in order.
    pub async fn sent_documents(&self) -> Vec<String> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Make every following `send()` block after recording its document,
    /// until [`release_sends`](Self::release_sends).
    pub fn hold_sends(&self) {
        self.gate.send_replace(true);
    }

    pub fn release_sends(&self) {
        self.gate.send_replace(false);
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockConnector {
    fn name(&self) -> &str {
        "mock-tally"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Target
    }

    async fn health_check(&self) -> Result<HealthStatus, AgentError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy("mock tally offline".into()))
        }
    }

    async fn shutdown(&self) -> Result<(), AgentError> {
        Ok(())
    }
}

#[async_trait]
impl TargetConnector for MockConnector {
    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn send(&self, document: &str) -> Result<String, AgentError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(AgentError::TargetUnavailable("mock tally offline".into()));
        }
        self.sent.lock().await.push(document.to_string());
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|held| !held).await;
        match self.replies.lock().await.pop_front() {
            Some(Ok(body)) => Ok(body),
            Some(Err(message)) => Err(AgentError::transport(message)),
            None => Ok(CREATED_RESPONSE.to_string()),
        }
    }

    async fn edition(&self) -> Option<String> {
        self.available
            .load(Ordering::SeqCst)
            .then(|| "Prime".to_string())
    }

    async fn company_name(&self) -> Option<String> {
        self.available
            .load(Ordering::SeqCst)
            .then(|| "Test Company".to_string())
    }
}
