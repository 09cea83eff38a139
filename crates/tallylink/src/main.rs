// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! tallylink - background agent bridging a cloud job queue and a local Tally.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod doctor;
mod run;
mod status;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tallylink_config::model::TallylinkConfig;

/// tallylink - sync cloud jobs with a local Tally.
#[derive(Parser, Debug)]
#[command(name = "tallylink", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the cloud and execute jobs until interrupted.
    Run,
    /// Show offline queue statistics.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Check configuration, database, and Tally connectivity.
    Doctor {
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<TallylinkConfig, ExitCode> {
    let loaded = match path {
        Some(path) => tallylink_config::load_and_validate_path(path),
        None => tallylink_config::load_and_validate(),
    };
    loaded.map_err(|errors| {
        tallylink_config::render_errors(&errors);
        ExitCode::from(1)
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(code) => return code,
    };

    let result = match cli.command {
        Some(Commands::Run) => run::run_agent(config).await,
        Some(Commands::Status { json, plain }) => {
            status::run_status(&config, json, plain).await.map(|()| ExitCode::SUCCESS)
        }
        Some(Commands::Doctor { plain }) => doctor::run_doctor(&config, cli.config.as_deref(), plain)
            .await
            .map(|()| ExitCode::SUCCESS),
        None => {
            println!("tallylink: use --help for available commands");
            Ok(ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
