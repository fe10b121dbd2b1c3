//! Schema bootstrap DDL (§4.1 EnsureSchema / Reset).

pub const EXCHANGE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS exchange (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    url  TEXT NOT NULL
);
"#;

pub const EXCHANGE_TICK_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS exchange_tick (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    exchange_id   INTEGER NOT NULL REFERENCES exchange(id),
    currency_pair TEXT NOT NULL,
    interval      INTEGER NOT NULL,
    time          INTEGER NOT NULL,
    high          REAL NOT NULL,
    low           REAL NOT NULL,
    open          REAL NOT NULL,
    close         REAL NOT NULL,
    volume        REAL NOT NULL
);
"#;

pub const EXCHANGE_TICK_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_exchange_tick_unique
    ON exchange_tick(exchange_id, currency_pair, interval, time);
"#;

pub const POW_DATA_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS pow_data (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    pool                TEXT NOT NULL,
    currency_pair       TEXT NOT NULL,
    time                INTEGER NOT NULL,
    hashrate            REAL NOT NULL,
    workers             INTEGER,
    network_hashrate    REAL,
    network_difficulty  REAL,
    reward_pow          REAL,
    reward_pos          REAL,
    reward_dev          REAL
);
"#;

pub const POW_DATA_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_pow_data_unique
    ON pow_data(pool, time);
"#;

pub const VSP_INFO_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS vsp_info (
    name     TEXT PRIMARY KEY,
    api_url  TEXT NOT NULL,
    launched INTEGER NOT NULL
);
"#;

pub const VSP_TICK_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS vsp_tick (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    vsp              TEXT NOT NULL REFERENCES vsp_info(name),
    time             INTEGER NOT NULL,
    immature         INTEGER NOT NULL,
    live             INTEGER NOT NULL,
    voted            INTEGER NOT NULL,
    missed           INTEGER NOT NULL,
    pool_fee         REAL NOT NULL,
    proportion_live  REAL NOT NULL,
    user_count       INTEGER NOT NULL
);
"#;

pub const VSP_TICK_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_vsp_tick_unique
    ON vsp_tick(vsp, time);
"#;

pub const MEMPOOL_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS mempool (
    time                   INTEGER PRIMARY KEY,
    number_of_transactions INTEGER NOT NULL,
    size_bytes             INTEGER NOT NULL,
    total_fee              REAL NOT NULL,
    votes                  INTEGER NOT NULL,
    tickets                INTEGER NOT NULL,
    revocations            INTEGER NOT NULL,
    regular_transactions   INTEGER NOT NULL
);
"#;

pub const BLOCK_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS block (
    height INTEGER PRIMARY KEY,
    hash   TEXT NOT NULL UNIQUE,
    time   INTEGER NOT NULL
);
"#;

pub const VOTE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS vote (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    ticket_hash  TEXT NOT NULL,
    block_voted  INTEGER NOT NULL,
    block_hash   TEXT NOT NULL,
    time         INTEGER NOT NULL
);
"#;

pub const VOTE_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_vote_unique
    ON vote(ticket_hash, block_voted);
"#;

/// All table names the Store owns, for `Reset`.
pub const OWNED_TABLES: &[&str] = &[
    "vote",
    "block",
    "mempool",
    "vsp_tick",
    "vsp_info",
    "pow_data",
    "exchange_tick",
    "exchange",
];
