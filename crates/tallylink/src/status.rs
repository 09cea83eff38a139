// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tallylink status` command implementation.
//!
//! Reads queue statistics straight from the local database, so it works
//! whether or not an agent process is running.

use std::io::IsTerminal;
use std::path::Path;

use serde::Serialize;
use tallylink_cloud::StaticCredentials;
use tallylink_config::model::TallylinkConfig;
use tallylink_core::{AgentError, CredentialsProvider, OfflineQueue, QueueStats};
use tallylink_storage::SqliteQueue;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub registered: bool,
    pub agent_id: Option<String>,
    pub database_path: String,
    pub database_exists: bool,
    pub queue: Option<QueueStats>,
}

pub async fn collect_status(config: &TallylinkConfig) -> Result<StatusReport, AgentError> {
    let credentials = StaticCredentials::from_config(&config.cloud);
    let path = config.storage.database_path.clone();
    let database_exists = Path::new(&path).exists();

    // Opening a missing database would create it; report its absence instead.
    let queue = if database_exists {
        let queue = SqliteQueue::new(config.storage.clone());
        queue.initialize().await?;
        let stats = queue.get_stats().await?;
        queue.close().await?;
        Some(stats)
    } else {
        None
    };

    Ok(StatusReport {
        registered: credentials.is_registered(),
        agent_id: credentials.agent_id(),
        database_path: path,
        database_exists,
        queue,
    })
}

/// Run the `tallylink status` command.
pub async fn run_status(config: &TallylinkConfig, json: bool, plain: bool) -> Result<(), AgentError> {
    let report = collect_status(config).await?;

    if json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| AgentError::Internal(format!("failed to render status: {e}")))?;
        println!("{rendered}");
        return Ok(());
    }

    let use_color = !plain && std::io::stdout().is_terminal();
    print_status(&report, use_color);
    Ok(())
}

fn print_status(report: &StatusReport, use_color: bool) {
    println!();
    println!("  tallylink status");
    println!("  {}", "-".repeat(35));

    let agent = report.agent_id.as_deref().unwrap_or("-");
    match (report.registered, use_color) {
        (true, true) => {
            use colored::Colorize;
            println!("    Agent:      {} {agent}", "✓".green());
        }
        (true, false) => println!("    Agent:      [OK] {agent}"),
        (false, true) => {
            use colored::Colorize;
            println!("    Agent:      {} {}", "✗".red(), "not registered".red());
        }
        (false, false) => println!("    Agent:      [FAIL] not registered"),
    }

    println!("    Database:   {}", report.database_path);
    match &report.queue {
        Some(stats) => {
            println!("    Pending:    {}", stats.pending);
            println!("    Synced:     {}", stats.synced);
            println!("    Failed:     {}", stats.failed);
            println!("    Unreported: {}", stats.unreported);
        }
        None => println!("    Queue:      no database yet (created on first run)"),
    }
    println!();
}
