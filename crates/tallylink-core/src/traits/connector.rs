// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Target connector trait for the local accounting application.

use async_trait::async_trait;

use crate::error::AgentError;
use crate::traits::adapter::PluginAdapter;

/// Transport for protocol documents to the locally running target application.
#[async_trait]
pub trait TargetConnector: PluginAdapter {
    /// Short-timeout liveness probe. Never fails; transport errors mean `false`.
    async fn is_available(&self) -> bool;

    /// Posts a request document and returns the raw response body.
    ///
    /// A refused connection is reported as [`AgentError::TargetUnavailable`].
    async fn send(&self, document: &str) -> Result<String, AgentError>;

    /// Detected application edition, cached after the first success.
    async fn edition(&self) -> Option<String>;

    /// Active company name, cached after the first success.
    async fn company_name(&self) -> Option<String>;
}
