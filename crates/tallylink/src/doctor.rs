// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tallylink doctor` command implementation.
//!
//! Runs diagnostic checks against the local environment: configuration,
//! credentials, the offline queue database, Tally reachability, and the
//! cloud endpoint.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use tallylink_cloud::StaticCredentials;
use tallylink_config::model::TallylinkConfig;
use tallylink_core::{AgentError, CredentialsProvider, HealthStatus, OfflineQueue, PluginAdapter};
use tallylink_storage::SqliteQueue;
use tallylink_tally::TallyConnector;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `tallylink doctor` command.
pub async fn run_doctor(
    config: &TallylinkConfig,
    config_path: Option<&Path>,
    plain: bool,
) -> Result<(), AgentError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let results = vec![
        check_config(config_path),
        check_credentials(config),
        check_database(config).await,
        check_tally(config).await,
        check_cloud(config).await,
        check_memory(),
    ];

    println!();
    println!("  tallylink doctor");
    println!("  {}", "-".repeat(50));

    let mut issues = 0;
    for result in &results {
        if result.status != CheckStatus::Pass {
            issues += 1;
        }
        println!("{}", render_line(result, use_color));
    }

    println!();
    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    Ok(())
}

fn render_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal().to_string()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow().to_string()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red().to_string()),
        };
        format!("    {symbol} {:<14} {message} ({duration_ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<14} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// Re-run loading so the check reflects the files on disk right now.
fn check_config(config_path: Option<&Path>) -> CheckResult {
    let start = Instant::now();
    let loaded = match config_path {
        Some(path) => tallylink_config::load_and_validate_path(path),
        None => tallylink_config::load_and_validate(),
    };
    match loaded {
        Ok(_) => CheckResult::new("Configuration", CheckStatus::Pass, "valid", start),
        Err(errors) => CheckResult::new(
            "Configuration",
            CheckStatus::Fail,
            format!("{} error(s)", errors.len()),
            start,
        ),
    }
}

fn check_credentials(config: &TallylinkConfig) -> CheckResult {
    let start = Instant::now();
    let credentials = StaticCredentials::from_config(&config.cloud);
    if credentials.is_registered() {
        let agent = credentials.agent_id().unwrap_or_default();
        CheckResult::new("Credentials", CheckStatus::Pass, format!("agent {agent}"), start)
    } else {
        CheckResult::new(
            "Credentials",
            CheckStatus::Fail,
            "cloud.api_key and cloud.agent_id are not both set",
            start,
        )
    }
}

async fn check_database(config: &TallylinkConfig) -> CheckResult {
    let start = Instant::now();
    let db_path = &config.storage.database_path;
    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    let queue = SqliteQueue::new(config.storage.clone());
    if let Err(e) = queue.initialize().await {
        return CheckResult::new("Database", CheckStatus::Fail, format!("open failed: {e}"), start);
    }
    let result = match (queue.health_check().await, queue.get_stats().await) {
        (Ok(HealthStatus::Healthy), Ok(stats)) => CheckResult::new(
            "Database",
            CheckStatus::Pass,
            format!(
                "{} pending, {} unreported",
                stats.pending, stats.unreported
            ),
            start,
        ),
        (Ok(status), Ok(_)) => {
            CheckResult::new("Database", CheckStatus::Warn, format!("{status:?}"), start)
        }
        (Err(e), _) | (_, Err(e)) => {
            CheckResult::new("Database", CheckStatus::Fail, format!("query failed: {e}"), start)
        }
    };
    let _ = queue.close().await;
    result
}

async fn check_tally(config: &TallylinkConfig) -> CheckResult {
    let start = Instant::now();
    let connector = match TallyConnector::new(&config.tally) {
        Ok(connector) => connector,
        Err(e) => return CheckResult::new("Tally", CheckStatus::Fail, e.to_string(), start),
    };
    let url = connector.client().base_url().to_string();
    if !connector.client().ping().await {
        return CheckResult::new(
            "Tally",
            CheckStatus::Fail,
            format!("not reachable at {url}"),
            start,
        );
    }

    match connector.detect_edition().await {
        Ok(edition) => {
            let company = connector
                .detect_company()
                .await
                .unwrap_or_else(|_| "no company loaded".to_string());
            CheckResult::new(
                "Tally",
                CheckStatus::Pass,
                format!("{edition} at {url}, {company}"),
                start,
            )
        }
        Err(e) => CheckResult::new(
            "Tally",
            CheckStatus::Warn,
            format!("reachable but edition unknown: {e}"),
            start,
        ),
    }
}

/// Any HTTP answer from the cloud host counts as reachable.
async fn check_cloud(config: &TallylinkConfig) -> CheckResult {
    let start = Instant::now();
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            return CheckResult::new(
                "Cloud",
                CheckStatus::Fail,
                format!("HTTP client error: {e}"),
                start,
            );
        }
    };
    match client.head(&config.cloud.url).send().await {
        Ok(resp) => CheckResult::new(
            "Cloud",
            CheckStatus::Pass,
            format!("{} answered {}", config.cloud.url, resp.status()),
            start,
        ),
        Err(e) => CheckResult::new(
            "Cloud",
            CheckStatus::Fail,
            format!("unreachable: {e}"),
            start,
        ),
    }
}

#[cfg(not(target_env = "msvc"))]
fn check_memory() -> CheckResult {
    let start = Instant::now();
    let _ = tikv_jemalloc_ctl::epoch::advance();
    match tikv_jemalloc_ctl::stats::allocated::read() {
        Ok(allocated) => CheckResult::new(
            "Memory",
            CheckStatus::Pass,
            format!("{} KiB heap", allocated / 1024),
            start,
        ),
        Err(e) => CheckResult::new("Memory", CheckStatus::Warn, e.to_string(), start),
    }
}

#[cfg(target_env = "msvc")]
fn check_memory() -> CheckResult {
    CheckResult::new("Memory", CheckStatus::Pass, "not measured", Instant::now())
}
