//! PoW Hub (§4.4): composes mining-pool adapters behind a single periodic
//! cadence.

mod adapter;

pub use adapter::PoolAdapter;

use crate::store::Store;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// A mining-pool's public-statistics adapter. Unlike [`Collector`][c], a
/// pool has one cadence, so there is a single poll method.
///
/// [c]: crate::exchanges::Collector
#[async_trait]
pub trait Pool: Send + Sync {
    fn name(&self) -> &'static str;
    async fn poll(&self, token: &CancellationToken) -> Result<()>;
}

/// Static registry of supported pools: (name, API base URL, requires an
/// `api_key` query parameter).
const POOL_REGISTRY: &[(&str, &str, bool)] = &[
    ("coinmine", "https://coinmine.pl/dcr/api", false),
    ("uupool", "https://uupool.cn/api/dcr", true),
];

pub fn available_pools() -> Vec<&'static str> {
    POOL_REGISTRY.iter().map(|(name, _, _)| *name).collect()
}

/// Constructs one adapter per enabled pool name, skipping and logging any
/// unknown or disabled name.
pub fn construct_enabled(
    store: &Store,
    disabled: &[String],
    api_keys: &std::collections::HashMap<String, String>,
) -> Vec<Arc<dyn Pool>> {
    let mut pools: Vec<Arc<dyn Pool>> = Vec::new();

    for (name, base_url, needs_key) in POOL_REGISTRY {
        if disabled.iter().any(|d| d.eq_ignore_ascii_case(name)) {
            info!(pool = %name, "pow pool disabled by configuration");
            continue;
        }

        let api_key = if *needs_key {
            api_keys.get(*name).cloned()
        } else {
            None
        };

        pools.push(Arc::new(PoolAdapter::new(
            name,
            base_url,
            api_key,
            store.clone(),
        )));
    }

    pools
}

pub struct PowHub {
    pools: Vec<Arc<dyn Pool>>,
}

impl PowHub {
    pub fn new(pools: Vec<Arc<dyn Pool>>) -> Result<Self> {
        if pools.is_empty() {
            return Err(anyhow!("pow hub: no pool adapters available"));
        }
        Ok(Self { pools })
    }

    pub async fn collect(&self, token: &CancellationToken) {
        let mut handles = Vec::with_capacity(self.pools.len());
        for pool in &self.pools {
            if token.is_cancelled() {
                break;
            }
            let pool = pool.clone();
            let token = token.clone();
            handles.push(tokio::spawn(async move {
                if let Err(e) = pool.poll(&token).await {
                    error!(pool = pool.name(), error = %e, "poll failed");
                }
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Drives one ticker at `interval_seconds` (clamped by the caller, not
    /// here; see Supervisor §4.7).
    pub async fn run(&self, token: CancellationToken, interval_seconds: u64) {
        let mut ticker = interval(Duration::from_secs(interval_seconds));
        info!("pow hub started");
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("pow hub shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    self.collect(&token).await;
                }
            }
        }
    }
}
