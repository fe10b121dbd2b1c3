//! Shared HTTP client construction for exchange adapters (§5, §6).

use std::time::Duration;

/// One client per adapter, built once at construction time and reused for
/// every poll. A flat 60s timeout, no per-request retry: a timed-out or
/// failed poll is logged and skipped — the next scheduled tick tries again.
pub fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .user_agent("dcrextdata-rs/0.1")
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
