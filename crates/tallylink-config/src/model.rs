// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the tallylink agent.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level tallylink configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TallylinkConfig {
    /// Agent identity and logging settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Cloud job queue endpoint and credentials.
    #[serde(default)]
    pub cloud: CloudConfig,

    /// Local accounting application endpoint.
    #[serde(default)]
    pub tally: TallyConfig,

    /// Poll cadence and backoff settings.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Offline queue database settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Offline queue retention settings.
    #[serde(default)]
    pub queue: QueueConfig,
}

/// Agent identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "tallylink".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Cloud endpoint and agent credentials.
///
/// The agent counts as registered only when both `api_key` and `agent_id`
/// are present.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CloudConfig {
    /// Base URL of the cloud API.
    #[serde(default = "default_cloud_url")]
    pub url: String,

    /// Bearer token issued at registration. `None` leaves the agent unregistered.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Agent identifier issued at registration.
    #[serde(default)]
    pub agent_id: Option<String>,

    /// Shop the agent belongs to.
    #[serde(default)]
    pub shop_id: Option<String>,

    /// Timeout for poll and report requests, in seconds.
    #[serde(default = "default_cloud_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            url: default_cloud_url(),
            api_key: None,
            agent_id: None,
            shop_id: None,
            request_timeout_secs: default_cloud_timeout_secs(),
        }
    }
}

impl CloudConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_cloud_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_cloud_timeout_secs() -> u64 {
    30
}

/// Local accounting application endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TallyConfig {
    #[serde(default = "default_tally_host")]
    pub host: String,

    #[serde(default = "default_tally_port")]
    pub port: u16,

    /// Liveness probe timeout in milliseconds.
    #[serde(default = "default_liveness_timeout_ms")]
    pub liveness_timeout_ms: u64,

    /// Request timeout for protocol documents, in seconds.
    #[serde(default = "default_tally_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            host: default_tally_host(),
            port: default_tally_port(),
            liveness_timeout_ms: default_liveness_timeout_ms(),
            request_timeout_secs: default_tally_timeout_secs(),
        }
    }
}

impl TallyConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_tally_host() -> String {
    "localhost".to_string()
}

fn default_tally_port() -> u16 {
    9000
}

fn default_liveness_timeout_ms() -> u64 {
    2000
}

fn default_tally_timeout_secs() -> u64 {
    10
}

/// Poll cadence and backoff configuration.
///
/// The cloud may suggest a different interval on each poll; suggestions are
/// clamped to `[min_interval_secs, max_interval_secs]`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PollingConfig {
    /// Nominal poll interval in seconds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,

    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: u64,

    /// Factor applied to the interval once the failure threshold is reached.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Consecutive failures before multiplicative backoff kicks in.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Maximum unreported results re-sent per poll cycle.
    #[serde(default = "default_unreported_batch_size")]
    pub unreported_batch_size: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            min_interval_secs: default_min_interval_secs(),
            max_interval_secs: default_max_interval_secs(),
            backoff_multiplier: default_backoff_multiplier(),
            failure_threshold: default_failure_threshold(),
            unreported_batch_size: default_unreported_batch_size(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_secs(self.max_interval_secs)
    }
}

fn default_interval_secs() -> u64 {
    30
}

fn default_min_interval_secs() -> u64 {
    10
}

fn default_max_interval_secs() -> u64 {
    300 // 5 minutes
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_unreported_batch_size() -> usize {
    50
}

/// Offline queue database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("tallylink").join("offline-queue.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("offline-queue.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Offline queue retention configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Synced queue entries older than this many days are deleted.
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,

    /// How often the cleanup task runs, in seconds.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl QueueConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days * 24 * 60 * 60)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

fn default_retention_days() -> u64 {
    7
}

fn default_cleanup_interval_secs() -> u64 {
    3600 // 1 hour
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_base_url_uses_host_and_port() {
        let tally = TallyConfig {
            host: "10.0.0.5".to_string(),
            port: 9001,
            ..TallyConfig::default()
        };
        assert_eq!(tally.base_url(), "http://10.0.0.5:9001");
    }

    #[test]
    fn duration_helpers_convert_units() {
        let config = TallylinkConfig::default();
        assert_eq!(config.tally.liveness_timeout(), Duration::from_millis(2000));
        assert_eq!(config.tally.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.queue.retention(), Duration::from_secs(7 * 86_400));
        assert_eq!(config.polling.max_interval(), Duration::from_secs(300));
    }
}
