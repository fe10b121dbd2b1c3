//! Supervisor (§4.7): boots enabled components, owns the root cancellation
//! token, and waits for shutdown.

use crate::config::Config;
use crate::exchanges::{self, TickHub};
use crate::mempool::MempoolCollector;
use crate::pow::{self, PowHub};
use crate::store::Store;
use crate::vsp::VspCollector;
use crate::web;
use anyhow::Result;
use std::collections::HashMap;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Prints the supported log subsystems for `--debuglevel show`. Runs
/// before any database connection is attempted, and exits 0 immediately.
pub fn print_subsystems() {
    for subsystem in ["exchange", "pow", "vsp", "mempool", "store", "supervisor", "web"] {
        println!("{subsystem}");
    }
}

/// Drops every owned table after the caller has already confirmed. Returns
/// once the drop completes; the connection is not reused afterward.
pub fn reset(store: &Store) -> Result<()> {
    store.reset()?;
    info!("all owned tables dropped");
    Ok(())
}

/// Boots every enabled subsystem under one root cancellation token and
/// blocks until a shutdown signal is observed and every task has returned.
pub async fn run(config: Config) -> Result<()> {
    let store = Store::open(&config.db_path)?;
    let token = CancellationToken::new();

    let mut tasks = Vec::new();
    // Run in reverse registration order on shutdown, mirroring the
    // teardown-hook stack model of §4.7.
    let mut shutdown_hooks: Vec<Box<dyn FnOnce() + Send>> = Vec::new();

    if !config.disable_exchange_ticks {
        match store.ensure_exchange_schema() {
            Ok(()) => {
                let disabled = config.disabled_exchanges();
                let adapters = exchanges::construct_enabled(&store, &disabled).await;
                match TickHub::new(adapters) {
                    Ok(hub) => {
                        let hub_token = token.clone();
                        tasks.push(tokio::spawn(async move {
                            hub.run(hub_token).await;
                        }));
                        shutdown_hooks.push(Box::new(|| info!("tick hub teardown complete")));
                    }
                    Err(e) => error!(error = %e, "tick hub disabled: no adapters available"),
                }
            }
            Err(e) => {
                warn!(error = %e, "exchange schema bootstrap failed, disabling exchange ticks for this run");
            }
        }
    }

    if !config.disable_pow {
        match store.ensure_pow_schema() {
            Ok(()) => {
                let disabled = config.disabled_pows();
                let api_keys: HashMap<String, String> = HashMap::new();
                let pools = pow::construct_enabled(&store, &disabled, &api_keys);
                match PowHub::new(pools) {
                    Ok(hub) => {
                        let hub_token = token.clone();
                        let interval = config.pow_interval;
                        tasks.push(tokio::spawn(async move {
                            hub.run(hub_token, interval).await;
                        }));
                        shutdown_hooks.push(Box::new(|| info!("pow hub teardown complete")));
                    }
                    Err(e) => error!(error = %e, "pow hub disabled: no pools available"),
                }
            }
            Err(e) => {
                warn!(error = %e, "pow schema bootstrap failed, disabling pow collection for this run");
            }
        }
    }

    if !config.disable_vsp {
        match store.ensure_vsp_schema() {
            Ok(()) => {
                let collector = VspCollector::new(store.clone());
                let vsp_token = token.clone();
                let interval = config.effective_vsp_interval();
                tasks.push(tokio::spawn(async move {
                    collector.run(vsp_token, interval).await;
                }));
                shutdown_hooks.push(Box::new(|| info!("vsp collector teardown complete")));
            }
            Err(e) => {
                warn!(error = %e, "vsp schema bootstrap failed, disabling vsp collection for this run");
            }
        }
    }

    if !config.disable_mempool {
        match store.ensure_mempool_schema() {
            Ok(()) => {
                let collector = MempoolCollector::new(
                    store.clone(),
                    &config.rpc_host,
                    &config.rpc_user,
                    &config.rpc_pass,
                    config.mempool_interval,
                );
                let mempool_token = token.clone();
                tasks.push(tokio::spawn(async move {
                    collector.run(mempool_token).await;
                }));
                shutdown_hooks.push(Box::new(|| info!("mempool collector teardown complete")));
            }
            Err(e) => {
                warn!(error = %e, "mempool schema bootstrap failed, disabling mempool collection for this run");
            }
        }
    }

    if config.http_mode {
        let web_store = store.clone();
        let web_token = token.clone();
        let addr = format!("{}:{}", config.http_host, config.http_port);
        tasks.push(tokio::spawn(async move {
            if let Err(e) = web::serve(web_store, &addr, web_token).await {
                error!(error = %e, "read api server exited with an error");
            }
        }));
        shutdown_hooks.push(Box::new(|| info!("read api teardown complete")));
    }

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, cancelling all collectors");
    token.cancel();

    for task in tasks {
        let _ = task.await;
    }

    for hook in shutdown_hooks.into_iter().rev() {
        hook();
    }

    info!("all collectors returned, exiting");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler");
            std::future::pending::<()>().await;
            unreachable!()
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
