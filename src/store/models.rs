//! Normalized row and DTO shapes persisted by the Store.
//!
//! These are intentionally plain data: adapters build them in memory during
//! a single poll and hand them to the Store by value (see §3 Ownership).

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Everything a Source Adapter knows about itself at construction time.
#[derive(Debug, Clone)]
pub struct ExchangeDescriptor {
    pub name: &'static str,
    pub website_url: &'static str,
    pub short_interval_minutes: i64,
    pub long_interval_minutes: i64,
    pub historic_interval_minutes: i64,
}

/// The three cursors `RegisterExchange` hands back to a fresh adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExchangeCursors {
    pub last_short: Option<DateTime<Utc>>,
    pub last_long: Option<DateTime<Utc>>,
    pub last_historic: Option<DateTime<Utc>>,
}

/// One OHLCV sample, already normalized to the internal shape.
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    pub time: DateTime<Utc>,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub close: f64,
    pub volume: f64,
}

/// Read-side DTO for the paginated exchange tick endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct TickDto {
    pub exchange_name: String,
    pub currency_pair: String,
    pub interval: i64,
    pub time: DateTime<Utc>,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub close: f64,
    pub volume: f64,
}

/// One sampled snapshot of a mining pool's public statistics.
#[derive(Debug, Clone)]
pub struct PowDatum {
    pub pool: String,
    pub currency_pair: String,
    pub time: DateTime<Utc>,
    pub hashrate: f64,
    pub workers: Option<i64>,
    pub network_hashrate: Option<f64>,
    pub network_difficulty: Option<f64>,
    pub reward_pow: Option<f64>,
    pub reward_pos: Option<f64>,
    pub reward_dev: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PowDatumDto {
    pub pool: String,
    pub currency_pair: String,
    pub time: DateTime<Utc>,
    pub hashrate: f64,
    pub workers: Option<i64>,
    pub network_hashrate: Option<f64>,
    pub network_difficulty: Option<f64>,
}

/// Immutable descriptive fields for one VSP.
#[derive(Debug, Clone)]
pub struct VspInfo {
    pub name: String,
    pub api_url: String,
    pub launched: DateTime<Utc>,
}

/// One periodic sample of a VSP's live status.
#[derive(Debug, Clone)]
pub struct VspTick {
    pub vsp: String,
    pub time: DateTime<Utc>,
    pub immature: i64,
    pub live: i64,
    pub voted: i64,
    pub missed: i64,
    pub pool_fee: f64,
    pub proportion_live: f64,
    pub user_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VspTickDto {
    pub vsp: String,
    pub time: DateTime<Utc>,
    pub immature: i64,
    pub live: i64,
    pub voted: i64,
    pub missed: i64,
    pub pool_fee: f64,
    pub proportion_live: f64,
    pub user_count: i64,
}

/// One periodic snapshot of the node's mempool.
#[derive(Debug, Clone)]
pub struct MempoolDatum {
    pub time: DateTime<Utc>,
    pub number_of_transactions: i64,
    pub size_bytes: i64,
    pub total_fee: f64,
    pub votes: i64,
    pub tickets: i64,
    pub revocations: i64,
    pub regular_transactions: i64,
}

/// Node-pushed block header digest.
#[derive(Debug, Clone)]
pub struct Block {
    pub height: i64,
    pub hash: String,
    pub time: DateTime<Utc>,
}

/// Node-pushed vote record.
#[derive(Debug, Clone)]
pub struct Vote {
    pub ticket_hash: String,
    pub block_voted: i64,
    pub block_hash: String,
    pub time: DateTime<Utc>,
}
