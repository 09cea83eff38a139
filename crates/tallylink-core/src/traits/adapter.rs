// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait shared by the queue, target, and cloud adapters.

use async_trait::async_trait;

use crate::error::AgentError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for all tallylink adapters.
///
/// Provides identity, lifecycle, and health check capabilities so the
/// binary's `doctor` command can probe every collaborator uniformly.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the kind of adapter (queue, target, cloud).
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, AgentError>;

    /// Gracefully shuts down the adapter, releasing any held resources.
    async fn shutdown(&self) -> Result<(), AgentError>;
}
