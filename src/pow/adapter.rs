//! Generic mining-pool adapter (§4.4).
//!
//! Every pool in the registry exposes roughly the same shape (hashrate,
//! worker count, network difficulty, block reward split) behind a
//! pool-specific URL, so one adapter type is configured per pool rather
//! than hand-writing five near-identical structs.

use super::Pool;
use crate::store::{PowDatum, Store};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Vendor payload. Numeric fields the pool may omit are modeled as
/// `Option<f64>`/`Option<i64>` so a missing field is never conflated with
/// zero (§9 re-architecture guidance).
#[derive(Debug, Deserialize)]
struct PoolStats {
    hashrate: f64,
    workers: Option<i64>,
    network_hashrate: Option<f64>,
    network_difficulty: Option<f64>,
    block_reward_pow: Option<f64>,
    block_reward_pos: Option<f64>,
    block_reward_dev: Option<f64>,
}

pub struct PoolAdapter {
    name: &'static str,
    base_url: String,
    api_key: Option<String>,
    currency_pair: &'static str,
    store: Store,
    http: reqwest::Client,
}

impl PoolAdapter {
    pub fn new(name: &'static str, base_url: &str, api_key: Option<String>, store: Store) -> Self {
        Self {
            name,
            base_url: base_url.to_string(),
            api_key,
            currency_pair: "DCR",
            store,
            http: crate::exchanges::http::build_client(),
        }
    }
}

#[async_trait]
impl Pool for PoolAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    /// Fetches the pool's current statistics and stores them exactly once
    /// per poll.
    async fn poll(&self, _token: &CancellationToken) -> Result<()> {
        let cursor = self.store.last_pow_entry_time(self.name)?;

        let mut url = self.base_url.clone();
        if let Some(key) = &self.api_key {
            let separator = if url.contains('?') { '&' } else { '?' };
            url = format!("{url}{separator}api_key={key}");
        }

        let stats: PoolStats = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("{}: request failed", self.name))?
            .json()
            .await
            .with_context(|| format!("{}: decode failed", self.name))?;

        let sampled_at = Utc::now();
        if let Some(last) = cursor {
            if sampled_at <= last {
                debug!(pool = self.name, "sample time did not advance past cursor, skipping");
                return Ok(());
            }
        }

        let datum = PowDatum {
            pool: self.name.to_string(),
            currency_pair: self.currency_pair.to_string(),
            time: sampled_at,
            hashrate: stats.hashrate,
            workers: stats.workers,
            network_hashrate: stats.network_hashrate,
            network_difficulty: stats.network_difficulty,
            reward_pow: stats.block_reward_pow,
            reward_pos: stats.block_reward_pos,
            reward_dev: stats.block_reward_dev,
        };

        self.store.store_pow_datum(&datum)?;
        Ok(())
    }
}
