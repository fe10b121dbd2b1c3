//! Binance adapter, BTC/DCR pair (§4.2).

use super::Collector;
use crate::store::{ExchangeCursors, ExchangeDescriptor, Store, Tick};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub const NAME: &str = "binance";
pub const WEBSITE_URL: &str = "https://www.binance.com";
pub const PAIR: &str = "DCRBTC";

const SHORT_MINUTES: i64 = 5;
const LONG_MINUTES: i64 = 60;
const HISTORIC_MINUTES: i64 = 1440;

pub struct Binance {
    store: Store,
    http: reqwest::Client,
    cursors: Mutex<ExchangeCursors>,
}

impl Binance {
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

    async fn poll(&self, kline_interval: &str, interval_minutes: i64) -> Result<()> {
        let cursor = {
            let cursors = self.cursors.lock();
            match interval_minutes {
                SHORT_MINUTES => cursors.last_short,
                LONG_MINUTES => cursors.last_long,
                _ => cursors.last_historic,
            }
        };

        let mut url = format!(
            "https://api.binance.com/api/v3/klines?symbol={PAIR}&interval={kline_interval}&limit=1000"
        );
        if let Some(since) = cursor {
            url.push_str(&format!("&startTime={}", (since.timestamp_millis()) + 1));
        }

        // Binance returns one kline per row: [openTime, open, high, low,
        // close, volume, closeTime, ...]. Decoded as raw JSON arrays since
        // the row shape mixes numbers and numeric strings.
        let rows: Vec<Value> = self
            .http
            .get(&url)
            .send()
            .await
            .context("binance: request failed")?
            .json()
            .await
            .context("binance: decode failed")?;

        let ticks: Vec<Tick> = rows
            .iter()
            .filter_map(|row| row.as_array())
            .filter_map(|row| {
                let open_time_ms = row.first()?.as_i64()?;
                let time: DateTime<Utc> = Utc.timestamp_millis_opt(open_time_ms).single()?;
                let open: f64 = row.get(1)?.as_str()?.parse().ok()?;
                let high: f64 = row.get(2)?.as_str()?.parse().ok()?;
                let low: f64 = row.get(3)?.as_str()?.parse().ok()?;
                let close: f64 = row.get(4)?.as_str()?.parse().ok()?;
                let volume: f64 = row.get(5)?.as_str()?.parse().ok()?;
                Some(Tick {
                    time,
                    high,
                    low,
                    open,
                    close,
                    volume,
                })
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
impl Collector for Binance {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn get_short(&self, _token: &CancellationToken) -> Result<()> {
        self.poll("5m", SHORT_MINUTES).await
    }

    async fn get_long(&self, _token: &CancellationToken) -> Result<()> {
        self.poll("1h", LONG_MINUTES).await
    }

    async fn get_historic(&self, _token: &CancellationToken) -> Result<()> {
        self.poll("1d", HISTORIC_MINUTES).await
    }
}
