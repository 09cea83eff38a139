// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the queue, the router, and the sync engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::AgentError;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`crate::PluginAdapter`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Queue,
    Target,
    Cloud,
}

/// Operation tag carried by a cloud job.
///
/// The set is closed: every tag the router can dispatch has a variant, and
/// anything else lands in [`JobType::Unsupported`] so a single bad job never
/// fails deserialization of the whole poll response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobType {
    VoucherCreate,
    VoucherRead,
    LedgerCreate,
    LedgerRead,
    StockCreate,
    StockRead,
    ReportGenerate,
    Unsupported(String),
}

impl JobType {
    /// The wire tag for this job type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::VoucherCreate => "voucher.create",
            Self::VoucherRead => "voucher.read",
            Self::LedgerCreate => "ledger.create",
            Self::LedgerRead => "ledger.read",
            Self::StockCreate => "stock.create",
            Self::StockRead => "stock.read",
            Self::ReportGenerate => "report.generate",
            Self::Unsupported(tag) => tag,
        }
    }
}

impl From<String> for JobType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "voucher.create" => Self::VoucherCreate,
            "voucher.read" => Self::VoucherRead,
            "ledger.create" => Self::LedgerCreate,
            "ledger.read" => Self::LedgerRead,
            "stock.create" => Self::StockCreate,
            "stock.read" => Self::StockRead,
            "report.generate" => Self::ReportGenerate,
            _ => Self::Unsupported(tag),
        }
    }
}

impl From<JobType> for String {
    fn from(job_type: JobType) -> Self {
        job_type.as_str().to_string()
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work dispatched by the cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Globally unique, stable across redeliveries.
    pub id: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    #[serde(default)]
    pub payload: Value,
}

/// Failure classification reported to the cloud alongside an error message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    TallyUnavailable,
    ProtocolError,
    UnknownJobType,
    InvalidPayload,
    TransportError,
    ExecutionError,
    /// The process stopped between accepting a job and recording its outcome.
    Interrupted,
}

/// Uniform wrapper for a job's execution result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl JobOutcome {
    pub fn succeeded(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
        }
    }

    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            error_kind: Some(kind),
        }
    }

    /// Build a failure outcome from an error, keeping its wire classification.
    pub fn from_error(err: &AgentError) -> Self {
        Self::failed(err.kind(), err.to_string())
    }
}

/// Lifecycle of a [`QueueEntry`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Synced,
    Failed,
}

/// A local record of a job accepted for processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub job_id: String,
    pub job_type: JobType,
    pub payload: Value,
    pub status: QueueStatus,
    pub retry_count: u32,
    pub created_at: String,
    pub synced_at: Option<String>,
}

/// Durable proof of a job's execution outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedJob {
    pub job_id: String,
    pub result: JobOutcome,
    pub completed_at: String,
    pub reported: bool,
}

/// Queue counts computed on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub synced: u64,
    pub failed: u64,
    pub unreported: u64,
}

/// Severity passed to a [`crate::LogObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}
