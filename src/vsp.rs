//! VSP Collector (§4.5): periodic poll of a static registry of voting
//! service provider status endpoints.

use crate::store::{Store, VspInfo, VspTick};
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Static VSP endpoint registry: (name, API base URL).
const VSP_REGISTRY: &[(&str, &str)] = &[
    ("dcrvsp", "https://dcrvsp.dittrex.com/api/vsp"),
    ("stakey", "https://stakey.net/api/vsp"),
    ("decredvoting", "https://decredvoting.com/api/vsp"),
];

#[derive(Debug, Deserialize)]
struct VspStatus {
    #[serde(rename = "Launched")]
    launched: i64,
    #[serde(rename = "Immature")]
    immature: i64,
    #[serde(rename = "Live")]
    live: i64,
    #[serde(rename = "Voted")]
    voted: i64,
    #[serde(rename = "Missed")]
    missed: i64,
    #[serde(rename = "Fee")]
    pool_fee: f64,
    #[serde(rename = "ProportionLive")]
    proportion_live: f64,
    #[serde(rename = "UserCount")]
    user_count: i64,
}

pub struct VspCollector {
    store: Store,
    http: reqwest::Client,
}

impl VspCollector {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            http: crate::exchanges::http::build_client(),
        }
    }

    async fn poll_one(&self, name: &str, base_url: &str) -> Result<()> {
        let cursor = self.store.last_vsp_entry_time(name)?;

        let status: VspStatus = self
            .http
            .get(base_url)
            .send()
            .await
            .with_context(|| format!("{name}: request failed"))?
            .json()
            .await
            .with_context(|| format!("{name}: decode failed"))?;

        let launched: DateTime<Utc> = Utc
            .timestamp_opt(status.launched, 0)
            .single()
            .unwrap_or_else(Utc::now);

        self.store.upsert_vsp_info(&VspInfo {
            name: name.to_string(),
            api_url: base_url.to_string(),
            launched,
        })?;

        let sampled_at = Utc::now();
        if let Some(last) = cursor {
            if sampled_at <= last {
                debug!(vsp = name, "sample time did not advance past cursor, skipping tick");
                return Ok(());
            }
        }

        self.store.store_vsp_tick(&VspTick {
            vsp: name.to_string(),
            time: sampled_at,
            immature: status.immature,
            live: status.live,
            voted: status.voted,
            missed: status.missed,
            pool_fee: status.pool_fee,
            proportion_live: status.proportion_live,
            user_count: status.user_count,
        })?;

        Ok(())
    }

    /// Queries every VSP sequentially; one VSP's decode failure must not
    /// abort the others (§4.5).
    pub async fn collect(&self) {
        for (name, base_url) in VSP_REGISTRY {
            if let Err(e) = self.poll_one(name, base_url).await {
                error!(vsp = %name, error = %e, "poll failed");
            }
        }
    }

    /// Drives one ticker at `interval_seconds`. The 300-second floor is
    /// enforced by the Supervisor before this is called (§4.7).
    pub async fn run(&self, token: CancellationToken, interval_seconds: u64) {
        let mut ticker = interval(Duration::from_secs(interval_seconds));
        info!("vsp collector started");
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("vsp collector shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    self.collect().await;
                }
            }
        }
    }
}
