//! Bleutrade adapter, DCR/BTC pair (§4.2).

use super::Collector;
use crate::store::{ExchangeCursors, ExchangeDescriptor, Store, Tick};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

pub const NAME: &str = "bleutrade";
pub const WEBSITE_URL: &str = "https://bleutrade.com";
pub const PAIR: &str = "DCR_BTC";

const SHORT_MINUTES: i64 = 5;
const LONG_MINUTES: i64 = 60;
const HISTORIC_MINUTES: i64 = 1440;

#[derive(Debug, Deserialize)]
struct CandlesResponse {
    success: bool,
    result: Option<Vec<VendorCandle>>,
}

#[derive(Debug, Deserialize)]
struct VendorCandle {
    #[serde(rename = "TimeStamp")]
    timestamp: String,
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Volume")]
    volume: f64,
}

fn parse_vendor_time(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

pub struct Bleutrade {
    store: Store,
    http: reqwest::Client,
    cursors: Mutex<ExchangeCursors>,
}

impl Bleutrade {
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

    async fn poll(&self, period: &str, interval_minutes: i64) -> Result<()> {
        let url =
            format!("https://bleutrade.com/api/v3/public/getcandles?market={PAIR}&period={period}");

        let response: CandlesResponse = self
            .http
            .get(&url)
            .send()
            .await
            .context("bleutrade: request failed")?
            .json()
            .await
            .context("bleutrade: decode failed")?;

        if !response.success {
            return Err(anyhow!("bleutrade: vendor reported failure"));
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
            .filter_map(|c| {
                let time = parse_vendor_time(&c.timestamp)?;
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
impl Collector for Bleutrade {
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
