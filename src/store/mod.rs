//! The Store: the single relational sink every collector shares.
//!
//! A `rusqlite` connection behind a `parking_lot::Mutex`, wrapped in an
//! `Arc` so the handle is cheap to clone into every collector, covering
//! the eight owned tables described in §3.

mod error;
mod models;
mod schema;

pub use error::StoreError;
pub use models::*;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;
use tracing::{info, warn};

type Result<T> = std::result::Result<T, StoreError>;

const DATE_TEMPLATE: &str = "%Y-%m-%d %H:%M";

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

fn to_unix(t: DateTime<Utc>) -> i64 {
    t.timestamp()
}

fn from_unix(t: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(t, 0).single().unwrap_or_else(Utc::now)
}

impl Store {
    /// Open (or create) the sqlite file backing the store.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL; PRAGMA foreign_keys = ON;",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store, used by tests and by any one-shot tooling.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ---- Bootstrap (§4.1) -------------------------------------------------

    pub fn ensure_exchange_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(schema::EXCHANGE_TABLE)?;
        conn.execute_batch(schema::EXCHANGE_TICK_TABLE)?;
        conn.execute_batch(schema::EXCHANGE_TICK_INDEX)?;
        Ok(())
    }

    pub fn ensure_pow_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(schema::POW_DATA_TABLE)?;
        conn.execute_batch(schema::POW_DATA_INDEX)?;
        Ok(())
    }

    pub fn ensure_vsp_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(schema::VSP_INFO_TABLE)?;
        conn.execute_batch(schema::VSP_TICK_TABLE)?;
        conn.execute_batch(schema::VSP_TICK_INDEX)?;
        Ok(())
    }

    pub fn ensure_mempool_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(schema::MEMPOOL_TABLE)?;
        conn.execute_batch(schema::BLOCK_TABLE)?;
        conn.execute_batch(schema::VOTE_TABLE)?;
        conn.execute_batch(schema::VOTE_INDEX)?;
        Ok(())
    }

    /// Idempotent: creates every owned table if it doesn't already exist.
    pub fn ensure_schema(&self) -> Result<()> {
        self.ensure_exchange_schema()?;
        self.ensure_pow_schema()?;
        self.ensure_vsp_schema()?;
        self.ensure_mempool_schema()?;
        Ok(())
    }

    /// Drops every table the store owns. The caller (Supervisor) is
    /// responsible for the interactive y/n confirmation; the Store itself
    /// performs no confirmation and does not reuse the connection after
    /// this call returns.
    pub fn reset(&self) -> Result<()> {
        let conn = self.conn.lock();
        for table in schema::OWNED_TABLES {
            conn.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))?;
        }
        Ok(())
    }

    // ---- Exchange ticks (§4.1, §4.2) ---------------------------------------

    /// The cornerstone incremental-fetch primitive. Registers the exchange
    /// if absent (atomically: insert-or-fetch), then returns the max
    /// persisted `time` per cadence, or `None` if there are no ticks yet.
    pub fn register_exchange(&self, descriptor: &ExchangeDescriptor) -> Result<ExchangeCursors> {
        let conn = self.conn.lock();

        let existing_id: Option<i64> = conn
            .query_row(
                "SELECT id FROM exchange WHERE name = ?1",
                params![descriptor.name],
                |row| row.get(0),
            )
            .optional()?;

        let exchange_id = match existing_id {
            Some(id) => id,
            None => {
                conn.execute(
                    "INSERT INTO exchange (name, url) VALUES (?1, ?2)",
                    params![descriptor.name, descriptor.website_url],
                )?;
                return Ok(ExchangeCursors::default());
            }
        };

        let last_for_interval = |interval_minutes: i64| -> Result<Option<DateTime<Utc>>> {
            let max_time: Option<i64> = conn
                .query_row(
                    "SELECT MAX(time) FROM exchange_tick WHERE exchange_id = ?1 AND interval = ?2",
                    params![exchange_id, interval_minutes],
                    |row| row.get(0),
                )
                .optional()?
                .flatten();
            Ok(max_time.map(from_unix))
        };

        Ok(ExchangeCursors {
            last_short: last_for_interval(descriptor.short_interval_minutes)?,
            last_long: last_for_interval(descriptor.long_interval_minutes)?,
            last_historic: last_for_interval(descriptor.historic_interval_minutes)?,
        })
    }

    /// Inserts each tick, silently skipping unique-key collisions. Any other
    /// error aborts the batch and is returned alongside the last
    /// successfully stored time. Empty input is an error.
    pub fn store_exchange_ticks(
        &self,
        exchange_name: &str,
        interval_minutes: i64,
        currency_pair: &str,
        ticks: &[Tick],
    ) -> Result<DateTime<Utc>> {
        if ticks.is_empty() {
            return Err(StoreError::EmptyBatch(exchange_name.to_string()));
        }

        let conn = self.conn.lock();
        let exchange_id: i64 = conn.query_row(
            "SELECT id FROM exchange WHERE name = ?1",
            params![exchange_name],
            |row| row.get(0),
        )?;

        let first_time = ticks[0].time;
        // The vendor window is documented ascending by time (§5), so the
        // batch's own max is the correct cursor advance even when every
        // tick in it turns out to be a duplicate.
        let batch_max_time = ticks
            .iter()
            .map(|t| t.time)
            .max()
            .expect("checked non-empty above");
        let mut last_inserted_time: Option<DateTime<Utc>> = None;
        let mut added = 0usize;

        for tick in ticks {
            let outcome = conn.execute(
                "INSERT INTO exchange_tick
                    (exchange_id, currency_pair, interval, time, high, low, open, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    exchange_id,
                    currency_pair,
                    interval_minutes,
                    to_unix(tick.time),
                    tick.high,
                    tick.low,
                    tick.open,
                    tick.close,
                    tick.volume,
                ],
            );

            match outcome {
                Ok(_) => {
                    last_inserted_time = Some(match last_inserted_time {
                        Some(t) if t > tick.time => t,
                        _ => tick.time,
                    });
                    added += 1;
                }
                Err(e) => match StoreError::classify(e) {
                    StoreError::DuplicateIgnored => continue,
                    other => return Err(other),
                },
            }
        }

        match added {
            0 => info!(
                exchange = exchange_name,
                pair = currency_pair,
                interval_minutes,
                "No new ticks"
            ),
            1 => info!(
                exchange = exchange_name,
                pair = currency_pair,
                interval_minutes,
                time = %first_time.format(DATE_TEMPLATE),
                "received 1 tick, stored 1 entry"
            ),
            _ => info!(
                exchange = exchange_name,
                pair = currency_pair,
                interval_minutes,
                received = ticks.len(),
                stored = added,
                first = %first_time.format(DATE_TEMPLATE),
                last = %last_inserted_time.unwrap_or(batch_max_time).format(DATE_TEMPLATE),
                "stored ticks"
            ),
        }

        // A fully-duplicate batch must still advance the cursor to the
        // batch's own max time, not silently roll it back (§8 invariant 2).
        Ok(last_inserted_time.unwrap_or(batch_max_time))
    }

    pub fn all_exchange_ticks(&self, offset: i64, limit: i64) -> Result<Vec<TickDto>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT e.name, t.currency_pair, t.interval, t.time, t.high, t.low, t.open, t.close, t.volume
             FROM exchange_tick t
             JOIN exchange e ON e.id = t.exchange_id
             ORDER BY t.time DESC
             LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt
            .query_map(params![limit, offset], |row| {
                Ok(TickDto {
                    exchange_name: row.get(0)?,
                    currency_pair: row.get(1)?,
                    interval: row.get(2)?,
                    time: from_unix(row.get(3)?),
                    high: row.get(4)?,
                    low: row.get(5)?,
                    open: row.get(6)?,
                    close: row.get(7)?,
                    volume: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn all_exchange_ticks_count(&self) -> Result<i64> {
        let conn = self.conn.lock();
        Ok(conn.query_row("SELECT COUNT(*) FROM exchange_tick", [], |row| row.get(0))?)
    }

    // ---- PoW (§4.4) ---------------------------------------------------------

    pub fn last_pow_entry_time(&self, pool: &str) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn.lock();
        let max_time: Option<i64> = conn
            .query_row(
                "SELECT MAX(time) FROM pow_data WHERE pool = ?1",
                params![pool],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        Ok(max_time.map(from_unix))
    }

    pub fn store_pow_datum(&self, datum: &PowDatum) -> Result<()> {
        let conn = self.conn.lock();
        let outcome = conn.execute(
            "INSERT INTO pow_data
                (pool, currency_pair, time, hashrate, workers, network_hashrate, network_difficulty, reward_pow, reward_pos, reward_dev)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                datum.pool,
                datum.currency_pair,
                to_unix(datum.time),
                datum.hashrate,
                datum.workers,
                datum.network_hashrate,
                datum.network_difficulty,
                datum.reward_pow,
                datum.reward_pos,
                datum.reward_dev,
            ],
        );
        match outcome {
            Ok(_) => Ok(()),
            Err(e) => match StoreError::classify(e) {
                StoreError::DuplicateIgnored => {
                    warn!(pool = %datum.pool, "duplicate PoW datum ignored");
                    Ok(())
                }
                other => Err(other),
            },
        }
    }

    // ---- VSP (§4.5) -----------------------------------------------------

    pub fn last_vsp_entry_time(&self, vsp: &str) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn.lock();
        let max_time: Option<i64> = conn
            .query_row(
                "SELECT MAX(time) FROM vsp_tick WHERE vsp = ?1",
                params![vsp],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        Ok(max_time.map(from_unix))
    }

    pub fn upsert_vsp_info(&self, info: &VspInfo) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO vsp_info (name, api_url, launched) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET api_url = excluded.api_url",
            params![info.name, info.api_url, to_unix(info.launched)],
        )?;
        Ok(())
    }

    pub fn store_vsp_tick(&self, tick: &VspTick) -> Result<()> {
        let conn = self.conn.lock();
        let outcome = conn.execute(
            "INSERT INTO vsp_tick
                (vsp, time, immature, live, voted, missed, pool_fee, proportion_live, user_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                tick.vsp,
                to_unix(tick.time),
                tick.immature,
                tick.live,
                tick.voted,
                tick.missed,
                tick.pool_fee,
                tick.proportion_live,
                tick.user_count,
            ],
        );
        match outcome {
            Ok(_) => Ok(()),
            Err(e) => match StoreError::classify(e) {
                StoreError::DuplicateIgnored => Ok(()),
                other => Err(other),
            },
        }
    }

    pub fn all_vsp_ticks(&self, offset: i64, limit: i64) -> Result<Vec<VspTickDto>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT vsp, time, immature, live, voted, missed, pool_fee, proportion_live, user_count
             FROM vsp_tick ORDER BY time DESC LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt
            .query_map(params![limit, offset], |row| {
                Ok(VspTickDto {
                    vsp: row.get(0)?,
                    time: from_unix(row.get(1)?),
                    immature: row.get(2)?,
                    live: row.get(3)?,
                    voted: row.get(4)?,
                    missed: row.get(5)?,
                    pool_fee: row.get(6)?,
                    proportion_live: row.get(7)?,
                    user_count: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn all_vsp_ticks_count(&self) -> Result<i64> {
        let conn = self.conn.lock();
        Ok(conn.query_row("SELECT COUNT(*) FROM vsp_tick", [], |row| row.get(0))?)
    }

    // ---- Mempool / Block / Vote (§4.6) -----------------------------------

    pub fn last_mempool_entry_time(&self) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn.lock();
        let max_time: Option<i64> = conn
            .query_row("SELECT MAX(time) FROM mempool", [], |row| row.get(0))
            .optional()?
            .flatten();
        Ok(max_time.map(from_unix))
    }

    pub fn store_mempool_datum(&self, datum: &MempoolDatum) -> Result<()> {
        let conn = self.conn.lock();
        let outcome = conn.execute(
            "INSERT INTO mempool
                (time, number_of_transactions, size_bytes, total_fee, votes, tickets, revocations, regular_transactions)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                to_unix(datum.time),
                datum.number_of_transactions,
                datum.size_bytes,
                datum.total_fee,
                datum.votes,
                datum.tickets,
                datum.revocations,
                datum.regular_transactions,
            ],
        );
        match outcome {
            Ok(_) => Ok(()),
            Err(e) => match StoreError::classify(e) {
                StoreError::DuplicateIgnored => Ok(()),
                other => Err(other),
            },
        }
    }

    /// Idempotent on height: a second push for the same height is ignored.
    pub fn store_block(&self, block: &Block) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO block (height, hash, time) VALUES (?1, ?2, ?3)",
            params![block.height, block.hash, to_unix(block.time)],
        )?;
        Ok(())
    }

    pub fn store_vote(&self, vote: &Vote) -> Result<()> {
        let conn = self.conn.lock();
        let outcome = conn.execute(
            "INSERT INTO vote (ticket_hash, block_voted, block_hash, time) VALUES (?1, ?2, ?3, ?4)",
            params![
                vote.ticket_hash,
                vote.block_voted,
                vote.block_hash,
                to_unix(vote.time)
            ],
        );
        match outcome {
            Ok(_) => Ok(()),
            Err(e) => match StoreError::classify(e) {
                StoreError::DuplicateIgnored => Ok(()),
                other => Err(other),
            },
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn descriptor() -> ExchangeDescriptor {
        ExchangeDescriptor {
            name: "binance",
            website_url: "https://binance.com",
            short_interval_minutes: 5,
            long_interval_minutes: 60,
            historic_interval_minutes: 1440,
        }
    }

    fn tick_at(base: DateTime<Utc>, minutes: i64) -> Tick {
        Tick {
            time: base + Duration::minutes(minutes),
            high: 1.0,
            low: 1.0,
            open: 1.0,
            close: 1.0,
            volume: 1.0,
        }
    }

    #[test]
    fn register_new_exchange_returns_zero_cursors() {
        let store = Store::open_in_memory().unwrap();
        store.ensure_exchange_schema().unwrap();
        let cursors = store.register_exchange(&descriptor()).unwrap();
        assert!(cursors.last_short.is_none());
        assert!(cursors.last_long.is_none());
        assert!(cursors.last_historic.is_none());
    }

    #[test]
    fn idempotent_ingestion_s1_s2() {
        let store = Store::open_in_memory().unwrap();
        store.ensure_exchange_schema().unwrap();
        store.register_exchange(&descriptor()).unwrap();

        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ticks: Vec<Tick> = (0..10).map(|i| tick_at(base, i * 5)).collect();

        let last = store
            .store_exchange_ticks("binance", 5, "BTC/DCR", &ticks)
            .unwrap();
        assert_eq!(last, ticks.last().unwrap().time);
        assert_eq!(store.all_exchange_ticks_count().unwrap(), 10);

        // S2: re-run with the same ticks — row count must not change, and
        // the returned cursor must still be the batch's max time, not the
        // batch's first time, so the caller's cursor never moves backward.
        let last_again = store
            .store_exchange_ticks("binance", 5, "BTC/DCR", &ticks)
            .unwrap();
        assert_eq!(last_again, ticks.last().unwrap().time);
        assert_eq!(store.all_exchange_ticks_count().unwrap(), 10);

        let cursors = store.register_exchange(&descriptor()).unwrap();
        assert_eq!(cursors.last_short, Some(ticks.last().unwrap().time));
        assert_eq!(cursors.last_long, None);
    }

    #[test]
    fn fully_duplicate_batch_does_not_roll_the_cursor_back() {
        let store = Store::open_in_memory().unwrap();
        store.ensure_exchange_schema().unwrap();
        store.register_exchange(&descriptor()).unwrap();

        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ticks: Vec<Tick> = (0..10).map(|i| tick_at(base, i * 5)).collect();
        store
            .store_exchange_ticks("binance", 5, "BTC/DCR", &ticks)
            .unwrap();

        // Every tick in this second batch collides with an existing row, so
        // `added == 0`; the returned cursor must still be the batch's max
        // time rather than `ticks[0].time`.
        let last = store
            .store_exchange_ticks("binance", 5, "BTC/DCR", &ticks)
            .unwrap();
        assert_eq!(last, ticks.last().unwrap().time);
        assert_ne!(last, ticks.first().unwrap().time);
    }

    #[test]
    fn empty_batch_is_an_error() {
        let store = Store::open_in_memory().unwrap();
        store.ensure_exchange_schema().unwrap();
        store.register_exchange(&descriptor()).unwrap();
        let err = store.store_exchange_ticks("binance", 5, "BTC/DCR", &[]);
        assert!(matches!(err, Err(StoreError::EmptyBatch(_))));
    }

    #[test]
    fn pagination_math_s6() {
        let store = Store::open_in_memory().unwrap();
        store.ensure_exchange_schema().unwrap();
        store.register_exchange(&descriptor()).unwrap();

        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ticks: Vec<Tick> = (0..45).map(|i| tick_at(base, i * 5)).collect();
        store
            .store_exchange_ticks("binance", 5, "BTC/DCR", &ticks)
            .unwrap();

        let total = store.all_exchange_ticks_count().unwrap();
        assert_eq!(total, 45);

        let page_size = 20i64;
        let page2 = store.all_exchange_ticks((2 - 1) * page_size, page_size).unwrap();
        assert_eq!(page2.len(), 20);

        let page3 = store.all_exchange_ticks((3 - 1) * page_size, page_size).unwrap();
        assert_eq!(page3.len(), 5);
    }

    #[test]
    fn block_insertion_is_idempotent_on_height() {
        let store = Store::open_in_memory().unwrap();
        store.ensure_mempool_schema().unwrap();
        let block = Block {
            height: 100,
            hash: "abc".into(),
            time: Utc::now(),
        };
        store.store_block(&block).unwrap();
        store.store_block(&block).unwrap();
        let conn = store.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM block", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn data_survives_reopening_the_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dcrextdata.db");
        let path = path.to_str().unwrap();

        {
            let store = Store::open(path).unwrap();
            store.ensure_exchange_schema().unwrap();
            store.register_exchange(&descriptor()).unwrap();
            let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            let ticks = vec![tick_at(base, 0)];
            store
                .store_exchange_ticks("binance", 5, "BTC/DCR", &ticks)
                .unwrap();
        }

        let reopened = Store::open(path).unwrap();
        assert_eq!(reopened.all_exchange_ticks_count().unwrap(), 1);
    }

    #[test]
    fn reset_drops_owned_tables() {
        let store = Store::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        store.reset().unwrap();
        let conn = store.conn.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='exchange'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 0);
    }
}
