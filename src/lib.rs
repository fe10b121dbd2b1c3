//! dcrextdata-rs: external-data ingestion service (§1).
//!
//! The binary entry point lives in `main.rs`; this crate root exposes the
//! modules so integration tests and the Read API handlers can reach them.

pub mod config;
pub mod exchanges;
pub mod mempool;
pub mod pow;
pub mod store;
pub mod supervisor;
pub mod vsp;
pub mod web;

pub fn init_tracing(debuglevel: &str) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("dcrextdata={debuglevel}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
