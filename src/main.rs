//! dcrextdata-rs: external-data ingestion service for a cryptocurrency
//! ecosystem (§1). Polls exchanges, mining pools, and VSPs on independent
//! cadences, listens for node RPC push notifications, and persists
//! everything into one relational store behind idempotent upsert
//! semantics.

use dcrextdata::config::Config;
use dcrextdata::store::Store;
use dcrextdata::supervisor;
use std::io::{self, Write};
use tracing::{error, info};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let config = Config::load();

    // `--debuglevel show` prints the supported subsystems and exits before
    // any database connection is attempted.
    if config.is_show_command() {
        supervisor::print_subsystems();
        return std::process::ExitCode::SUCCESS;
    }

    dcrextdata::init_tracing(&config.effective_debuglevel());

    if config.reset {
        return run_reset(&config);
    }

    match supervisor::run(config).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal error, exiting");
            std::process::ExitCode::FAILURE
        }
    }
}

/// Interactive y/n confirmation before dropping all owned tables (§4.1,
/// §6, scenario S3). A successful reset terminates the process.
fn run_reset(config: &Config) -> std::process::ExitCode {
    print!("This will drop all tables in {}. Continue? (y/N) ", config.db_path);
    if io::stdout().flush().is_err() {
        error!("failed to flush stdout");
    }

    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        error!("failed to read confirmation");
        return std::process::ExitCode::FAILURE;
    }

    if !matches!(answer.trim(), "y" | "Y" | "yes" | "YES") {
        info!("reset cancelled");
        return std::process::ExitCode::SUCCESS;
    }

    let store = match Store::open(&config.db_path) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to open store for reset");
            return std::process::ExitCode::FAILURE;
        }
    };

    match supervisor::reset(&store) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "reset failed");
            std::process::ExitCode::FAILURE
        }
    }
}
