//! Tick Hub (§4.3): composes exchange adapters behind one scheduling
//! lifecycle.

use super::Collector;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Cadence {
    Short,
    Long,
    Historic,
}

pub struct TickHub {
    adapters: Vec<Arc<dyn Collector>>,
    /// Per-adapter-per-cadence in-flight guards (§9: a second Long pass must
    /// not start while the first on the same adapter is still running).
    in_flight: HashMap<(&'static str, Cadence), Arc<AtomicBool>>,
}

impl TickHub {
    /// Builds a hub from an already-constructed adapter set. Per §4.3, zero
    /// surviving adapters is a hard error.
    pub fn new(adapters: Vec<Arc<dyn Collector>>) -> Result<Self> {
        if adapters.is_empty() {
            return Err(anyhow!("tick hub: no exchange adapters available"));
        }

        let mut in_flight = HashMap::new();
        for adapter in &adapters {
            for cadence in [Cadence::Short, Cadence::Long, Cadence::Historic] {
                in_flight.insert((adapter.name(), cadence), Arc::new(AtomicBool::new(false)));
            }
        }

        Ok(Self { adapters, in_flight })
    }

    async fn collect_pass(&self, cadence: Cadence, token: &CancellationToken) {
        let mut handles = Vec::with_capacity(self.adapters.len());

        for adapter in &self.adapters {
            if token.is_cancelled() {
                break;
            }

            let guard = self
                .in_flight
                .get(&(adapter.name(), cadence))
                .expect("guard registered at construction")
                .clone();

            if guard.swap(true, Ordering::SeqCst) {
                warn!(
                    exchange = adapter.name(),
                    cadence = ?cadence,
                    "previous pass for this adapter/cadence still running, skipping"
                );
                continue;
            }

            let adapter = adapter.clone();
            let token = token.clone();
            handles.push(tokio::spawn(async move {
                let result = match cadence {
                    Cadence::Short => adapter.get_short(&token).await,
                    Cadence::Long => adapter.get_long(&token).await,
                    Cadence::Historic => adapter.get_historic(&token).await,
                };
                if let Err(e) = result {
                    tracing::error!(exchange = adapter.name(), error = %e, "poll failed");
                }
                guard.store(false, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
    }

    pub async fn collect_short(&self, token: &CancellationToken) {
        self.collect_pass(Cadence::Short, token).await;
    }

    pub async fn collect_long(&self, token: &CancellationToken) {
        self.collect_pass(Cadence::Long, token).await;
    }

    pub async fn collect_historic(&self, token: &CancellationToken) {
        self.collect_pass(Cadence::Historic, token).await;
    }

    /// Runs the three cadences sequentially, once, per adapter.
    pub async fn collect_all(&self, token: &CancellationToken) {
        for adapter in &self.adapters {
            if token.is_cancelled() {
                return;
            }
            if let Err(e) = adapter.get_short(token).await {
                tracing::error!(exchange = adapter.name(), error = %e, "short poll failed");
            }
            if let Err(e) = adapter.get_long(token).await {
                tracing::error!(exchange = adapter.name(), error = %e, "long poll failed");
            }
            if let Err(e) = adapter.get_historic(token).await {
                tracing::error!(exchange = adapter.name(), error = %e, "historic poll failed");
            }
        }
    }

    /// Owns three tickers (5min/1hr/24hr). Returns cleanly on cancellation;
    /// any in-flight pass is allowed to finish (cancellation is observed at
    /// the next I/O checkpoint inside the adapters themselves).
    pub async fn run(&self, token: CancellationToken) {
        let mut short_ticker = interval(Duration::from_secs(5 * 60));
        let mut long_ticker = interval(Duration::from_secs(60 * 60));
        let mut historic_ticker = interval(Duration::from_secs(24 * 60 * 60));

        info!("tick hub started");
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("tick hub shutting down");
                    return;
                }
                _ = short_ticker.tick() => {
                    self.collect_short(&token).await;
                }
                _ = long_ticker.tick() => {
                    self.collect_long(&token).await;
                }
                _ = historic_ticker.tick() => {
                    self.collect_historic(&token).await;
                }
            }
        }
    }
}
