// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tallylink run` command implementation.
//!
//! Wires the SQLite queue, the Tally connector, and the cloud client into a
//! [`SyncEngine`], runs it until SIGINT/SIGTERM or an authentication halt,
//! and prunes old queue entries in the background.

use std::process::ExitCode;
use std::sync::Arc;

use tallylink_agent::shutdown::{self, ShutdownReason};
use tallylink_agent::{AgentLog, EngineParts, SyncEngine};
use tallylink_cloud::{HttpCloudClient, StaticCredentials};
use tallylink_config::model::{QueueConfig, TallylinkConfig};
use tallylink_core::{AgentError, CredentialsProvider, OfflineQueue, PluginAdapter};
use tallylink_storage::SqliteQueue;
use tallylink_tally::TallyConnector;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Exit code when the cloud rejected the credentials.
const EXIT_AUTHENTICATION: u8 = 2;

pub async fn run_agent(config: TallylinkConfig) -> Result<ExitCode, AgentError> {
    init_tracing(&config.agent.log_level);
    info!(name = %config.agent.name, "starting tallylink agent");

    let queue = Arc::new(SqliteQueue::new(config.storage.clone()));
    queue.initialize().await?;

    let connector = Arc::new(TallyConnector::new(&config.tally)?);
    let credentials: Arc<dyn CredentialsProvider> =
        Arc::new(StaticCredentials::from_config(&config.cloud));
    if !credentials.is_registered() {
        error!("agent is not registered: set cloud.api_key and cloud.agent_id");
        return Err(AgentError::Config(
            "cloud.api_key and cloud.agent_id are required to run".into(),
        ));
    }
    let cloud = Arc::new(HttpCloudClient::new(&config.cloud, Arc::clone(&credentials))?);

    let engine = SyncEngine::new(
        &config.polling,
        EngineParts {
            connector: connector.clone(),
            queue: queue.clone(),
            cloud,
            credentials,
            log: AgentLog::default(),
        },
    );

    let cancel = shutdown::install_signal_handler();

    {
        let queue = queue.clone();
        let queue_config = config.queue.clone();
        let cleanup_cancel = cancel.clone();
        tokio::spawn(async move {
            cleanup_task(queue.as_ref(), &queue_config, cleanup_cancel).await;
        });
    }

    engine.start().await?;
    let reason = shutdown::run_until_shutdown(&engine, cancel.clone()).await;
    cancel.cancel();

    if let Err(e) = queue.shutdown().await {
        warn!(error = %e, "offline queue checkpoint failed during shutdown");
    }
    connector.shutdown().await?;

    match reason {
        ShutdownReason::AuthenticationHalted(message) => {
            error!(%message, "polling halted: the cloud rejected the agent's credentials");
            eprintln!(
                "tallylink: authentication failed ({message}). Update cloud.api_key and restart."
            );
            Ok(ExitCode::from(EXIT_AUTHENTICATION))
        }
        ShutdownReason::Signal | ShutdownReason::Stopped => {
            info!("tallylink shutdown complete");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Deletes synced queue entries older than the retention window, once per
/// cleanup interval. The first pass runs after one full interval.
async fn cleanup_task(queue: &dyn OfflineQueue, config: &QueueConfig, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(config.cleanup_interval());
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match queue.cleanup(config.retention()).await {
                    Ok(0) => debug!("queue cleanup: nothing to delete"),
                    Ok(deleted) => info!(deleted, "queue cleanup removed old entries"),
                    Err(e) => warn!(error = %e, "queue cleanup failed (non-fatal)"),
                }
            }
            _ = cancel.cancelled() => {
                debug!("queue cleanup task shutting down");
                break;
            }
        }
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "tallylink={log_level},tallylink_agent={log_level},tallylink_tally={log_level},\
             tallylink_cloud={log_level},tallylink_storage={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
