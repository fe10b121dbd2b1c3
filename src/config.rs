//! CLI flags and configuration loading (§6), layered CLI > env > default via
//! `clap`'s `env` feature, with `.env` loaded by `dotenv` underneath the
//! environment.

use clap::{Parser, ValueEnum};
use tracing::warn;

/// VSP interval is clamped to this floor; see §4.7 / §9.
pub const VSP_MIN_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Network {
    Mainnet,
    Testnet3,
}

#[derive(Debug, Parser)]
#[command(name = "dcrextdata", about = "External-data ingestion service")]
pub struct Config {
    /// Drop all owned tables after interactive confirmation, then exit.
    #[arg(long, env = "DCREXTDATA_RESET")]
    pub reset: bool,

    /// Sugar for `--debuglevel error`.
    #[arg(long, env = "DCREXTDATA_QUIET")]
    pub quiet: bool,

    /// Log level/subsystem spec. The special value `show` prints the
    /// supported subsystems and exits before any database connection is
    /// attempted.
    #[arg(long, env = "DCREXTDATA_DEBUGLEVEL", default_value = "info")]
    pub debuglevel: String,

    /// Path to the sqlite database file.
    #[arg(long, env = "DCREXTDATA_DB_PATH", default_value = "./dcrextdata.db")]
    pub db_path: String,

    /// Node RPC host:port.
    #[arg(long, env = "DCREXTDATA_RPC_HOST", default_value = "127.0.0.1:9109")]
    pub rpc_host: String,

    #[arg(long, env = "DCREXTDATA_RPC_USER", default_value = "")]
    pub rpc_user: String,

    #[arg(long, env = "DCREXTDATA_RPC_PASS", default_value = "")]
    pub rpc_pass: String,

    #[arg(long, env = "DCREXTDATA_NETWORK", value_enum, default_value_t = Network::Mainnet)]
    pub network: Network,

    /// Explicit path to the node's `rpc.cert`. When unset, resolved from
    /// the node's default app-data directory (dcrd's `AppDataDir`
    /// equivalent).
    #[arg(long, env = "DCREXTDATA_RPC_CERT")]
    pub rpc_cert: Option<String>,

    #[arg(long, env = "DCREXTDATA_DISABLE_MEMPOOL")]
    pub disable_mempool: bool,

    #[arg(long, env = "DCREXTDATA_DISABLE_VSP")]
    pub disable_vsp: bool,

    #[arg(long, env = "DCREXTDATA_DISABLE_EXCHANGE_TICKS")]
    pub disable_exchange_ticks: bool,

    #[arg(long, env = "DCREXTDATA_DISABLE_POW")]
    pub disable_pow: bool,

    /// Comma-separated exchange names to skip.
    #[arg(long, env = "DCREXTDATA_DISABLED_EXCHANGES", default_value = "")]
    pub disabled_exchanges: String,

    /// Comma-separated pool names to skip.
    #[arg(long, env = "DCREXTDATA_DISABLED_POWS", default_value = "")]
    pub disabled_pows: String,

    /// Seconds; clamped to a floor of 300 (warning logged if raised).
    #[arg(long, env = "DCREXTDATA_VSP_INTERVAL", default_value_t = 300)]
    pub vsp_interval: u64,

    #[arg(long, env = "DCREXTDATA_POW_INTERVAL", default_value_t = 300)]
    pub pow_interval: u64,

    #[arg(long, env = "DCREXTDATA_MEMPOOL_INTERVAL", default_value_t = 60)]
    pub mempool_interval: u64,

    #[arg(long, env = "DCREXTDATA_HTTP_MODE")]
    pub http_mode: bool,

    #[arg(long, env = "DCREXTDATA_HTTP_HOST", default_value = "127.0.0.1")]
    pub http_host: String,

    #[arg(long, env = "DCREXTDATA_HTTP_PORT", default_value_t = 7777)]
    pub http_port: u16,
}

impl Config {
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Config::parse()
    }

    pub fn is_show_command(&self) -> bool {
        self.debuglevel.eq_ignore_ascii_case("show")
    }

    /// `--quiet` applied before the tracing `EnvFilter` is built.
    pub fn effective_debuglevel(&self) -> String {
        if self.quiet {
            "error".to_string()
        } else {
            self.debuglevel.clone()
        }
    }

    /// Clamps the configured VSP interval to the 300s floor, warning if it
    /// had to (§4.7, §8 invariant 6, scenario S4).
    pub fn effective_vsp_interval(&self) -> u64 {
        if self.vsp_interval < VSP_MIN_INTERVAL_SECS {
            warn!(
                configured = self.vsp_interval,
                "VSP collection interval cannot be less that {VSP_MIN_INTERVAL_SECS}, setting to {VSP_MIN_INTERVAL_SECS}"
            );
            VSP_MIN_INTERVAL_SECS
        } else {
            self.vsp_interval
        }
    }

    pub fn disabled_exchanges(&self) -> Vec<String> {
        split_csv(&self.disabled_exchanges)
    }

    pub fn disabled_pows(&self) -> Vec<String> {
        split_csv(&self.disabled_pows)
    }

    /// Resolves the node's TLS cert path: explicit override, or the
    /// platform default app-data directory for `dcrd`.
    pub fn cert_path(&self) -> String {
        if let Some(path) = &self.rpc_cert {
            return path.clone();
        }
        default_dcrd_cert_path()
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(target_os = "windows")]
fn default_dcrd_cert_path() -> String {
    let base = std::env::var("LOCALAPPDATA").unwrap_or_else(|_| ".".to_string());
    format!("{base}\\Dcrd\\rpc.cert")
}

#[cfg(not(target_os = "windows"))]
fn default_dcrd_cert_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.dcrd/rpc.cert")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_small_vsp_interval() {
        let cfg = Config::parse_from(["dcrextdata", "--vsp-interval", "60"]);
        assert_eq!(cfg.effective_vsp_interval(), VSP_MIN_INTERVAL_SECS);
    }

    #[test]
    fn leaves_large_vsp_interval_alone() {
        let cfg = Config::parse_from(["dcrextdata", "--vsp-interval", "600"]);
        assert_eq!(cfg.effective_vsp_interval(), 600);
    }

    #[test]
    fn quiet_forces_error_level() {
        let cfg = Config::parse_from(["dcrextdata", "--quiet"]);
        assert_eq!(cfg.effective_debuglevel(), "error");
    }

    #[test]
    fn splits_disabled_csv() {
        let cfg = Config::parse_from(["dcrextdata", "--disabled-exchanges", "bittrex, poloniex"]);
        assert_eq!(cfg.disabled_exchanges(), vec!["bittrex", "poloniex"]);
    }
}
