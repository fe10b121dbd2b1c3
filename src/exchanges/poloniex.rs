//! Poloniex adapter, BTC/DCR pair (§4.2).

use super::Collector;
use crate::store::{ExchangeCursors, ExchangeDescriptor, Store, Tick};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

pub const NAME: &str = "poloniex";
pub const WEBSITE_URL: &str = "https://poloniex.com";
pub const PAIR: &str = "BTC_DCR";

const SHORT_MINUTES: i64 = 5;
const LONG_MINUTES: i64 = 60;
const HISTORIC_MINUTES: i64 = 1440;

#[derive(Debug, Deserialize)]
struct VendorCandle {
    date: i64,
    high: f64,
    low: f64,
    open: f64,
    close: f64,
    volume: f64,
}

pub struct Poloniex {
    store: Store,
    http: reqwest::Client,
    cursors: Mutex<ExchangeCursors>,
}

impl Poloniex {
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

    async fn poll(&self, period_seconds: i64, interval_minutes: i64) -> Result<()> {
        let cursor = {
            let cursors = self.cursors.lock();
            match interval_minutes {
                SHORT_MINUTES => cursors.last_short,
                LONG_MINUTES => cursors.last_long,
                _ => cursors.last_historic,
            }
        };

        let start = cursor.map(|t| t.timestamp() + 1).unwrap_or(0);
        let url = format!(
            "https://poloniex.com/public?command=returnChartData&currencyPair={PAIR}&period={period_seconds}&start={start}&end=9999999999"
        );

        let candles: Vec<VendorCandle> = self
            .http
            .get(&url)
            .send()
            .await
            .context("poloniex: request failed")?
            .json()
            .await
            .context("poloniex: decode failed")?;

        let ticks: Vec<Tick> = candles
            .into_iter()
            .filter_map(|c| {
                let time: DateTime<Utc> = Utc.timestamp_opt(c.date, 0).single()?;
                if cursor.map(|cur| time > cur).unwrap_or(true) {
                    Some(Tick {
                        time,
                        high: c.high,
                        low: c.low,
                        open: c.open,
                        close: c.close,
                        volume: c.volume,
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
impl Collector for Poloniex {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn get_short(&self, _token: &CancellationToken) -> Result<()> {
        self.poll(300, SHORT_MINUTES).await
    }

    async fn get_long(&self, _token: &CancellationToken) -> Result<()> {
        self.poll(3600, LONG_MINUTES).await
    }

    async fn get_historic(&self, _token: &CancellationToken) -> Result<()> {
        self.poll(86400, HISTORIC_MINUTES).await
    }
}
