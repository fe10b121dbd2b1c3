//! Bittrex adapter, USD/DCR pair (§4.2). Same vendor API as [`super::bittrex`]
//! but registered under a distinct exchange name since it tracks a
//! different currency pair with its own cursor.

use super::Collector;
use crate::store::{ExchangeCursors, ExchangeDescriptor, Store, Tick};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

pub const NAME: &str = "bittrexusd";
pub const WEBSITE_URL: &str = "https://bittrex.com";
pub const PAIR: &str = "USD-DCR";

const SHORT_MINUTES: i64 = 5;
const LONG_MINUTES: i64 = 60;
const HISTORIC_MINUTES: i64 = 1440;

#[derive(Debug, Deserialize)]
struct TicksResponse {
    success: bool,
    #[allow(dead_code)]
    message: String,
    result: Option<Vec<VendorTick>>,
}

#[derive(Debug, Deserialize)]
struct VendorTick {
    #[serde(rename = "O")]
    open: f64,
    #[serde(rename = "H")]
    high: f64,
    #[serde(rename = "L")]
    low: f64,
    #[serde(rename = "C")]
    close: f64,
    #[serde(rename = "V")]
    volume: f64,
    #[serde(rename = "T")]
    time: String,
}

fn parse_vendor_time(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

pub struct BittrexUsd {
    store: Store,
    http: reqwest::Client,
    cursors: Mutex<ExchangeCursors>,
}

impl BittrexUsd {
    pub async fn construct(store: Store) -> Result<Self> {
        let cursors = store.register_exchange(&ExchangeDescriptor {
            name: NAME,
            website_url: WEBSITE_URL,
            short_interval_minutes: SHORT_MINUTES,
            long_interval_minutes: LONG_MINUTES,
            historic_interval_minutes: HISTORIC_MINUTES,
        })?;

        Ok(Self {
            store,
            http: super::http::build_client(),
            cursors: Mutex::new(cursors),
        })
    }

    async fn poll(&self, tick_interval: &str, interval_minutes: i64) -> Result<()> {
        let url = format!(
            "https://bittrex.com/Api/v2.0/pub/market/GetTicks?marketName={PAIR}&tickInterval={tick_interval}"
        );

        let response: TicksResponse = self
            .http
            .get(&url)
            .send()
            .await
            .context("bittrexusd: request failed")?
            .json()
            .await
            .context("bittrexusd: decode failed")?;

        if !response.success {
            return Err(anyhow!("bittrexusd: vendor reported failure"));
        }

        let cursor = {
            let cursors = self.cursors.lock();
            match interval_minutes {
                SHORT_MINUTES => cursors.last_short,
                LONG_MINUTES => cursors.last_long,
                _ => cursors.last_historic,
            }
        };

        let ticks: Vec<Tick> = response
            .result
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| {
                let time = parse_vendor_time(&v.time)?;
                if cursor.map(|c| time > c).unwrap_or(true) {
                    Some(Tick {
                        time,
                        high: v.high,
                        low: v.low,
                        open: v.open,
                        close: v.close,
                        volume: v.volume,
                    })
                } else {
                    None
                }
            })
            .collect();

        if ticks.is_empty() {
            tracing::info!(exchange = NAME, pair = PAIR, "no new ticks");
            return Ok(());
        }

        let last_stored = self
            .store
            .store_exchange_ticks(NAME, interval_minutes, PAIR, &ticks)?;

        let mut cursors = self.cursors.lock();
        match interval_minutes {
            SHORT_MINUTES => cursors.last_short = Some(last_stored),
            LONG_MINUTES => cursors.last_long = Some(last_stored),
            _ => cursors.last_historic = Some(last_stored),
        }

        Ok(())
    }
}

#[async_trait]
impl Collector for BittrexUsd {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn get_short(&self, _token: &CancellationToken) -> Result<()> {
        self.poll("fiveMin", SHORT_MINUTES).await
    }

    async fn get_long(&self, _token: &CancellationToken) -> Result<()> {
        self.poll("hour", LONG_MINUTES).await
    }

    async fn get_historic(&self, _token: &CancellationToken) -> Result<()> {
        self.poll("day", HISTORIC_MINUTES).await
    }
}
