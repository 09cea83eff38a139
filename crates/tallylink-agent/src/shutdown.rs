// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal handling for the agent process.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that the binary waits on before stopping the
//! [`SyncEngine`](crate::SyncEngine).

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{EngineStatus, SyncEngine};

/// Returns a token cancelled on the first SIGINT or SIGTERM.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        wait_for_signal().await;
        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler, waiting for Ctrl+C only");
            let _ = tokio::signal::ctrl_c().await;
            info!("received SIGINT (Ctrl+C), initiating shutdown");
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received SIGINT (Ctrl+C), initiating shutdown");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, initiating shutdown");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("received Ctrl+C, initiating shutdown");
}

/// Why [`run_until_shutdown`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    Signal,
    AuthenticationHalted(String),
    Stopped,
}

/// Wait until `cancel` fires or the engine leaves the running state, then
/// stop the engine.
pub async fn run_until_shutdown(engine: &SyncEngine, cancel: CancellationToken) -> ShutdownReason {
    let mut status = engine.subscribe();
    let reason = tokio::select! {
        _ = cancel.cancelled() => ShutdownReason::Signal,
        changed = status.wait_for(|s| !s.is_running()) => match changed.as_deref() {
            Ok(EngineStatus::AuthenticationHalted(message)) => {
                ShutdownReason::AuthenticationHalted(message.clone())
            }
            _ => ShutdownReason::Stopped,
        },
    };
    engine.stop().await;
    reason
}
