//! Source Adapters for cryptocurrency exchanges (§4.2) and their composing
//! Tick Hub (§4.3).

pub mod binance;
pub mod bittrex;
pub mod bittrex_usd;
pub mod bleutrade;
pub mod http;
pub mod poloniex;

mod hub;
pub use hub::TickHub;

use crate::store::Store;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything a Source Adapter must support. One poll per method per call;
/// no retry inside the adapter — the outer scheduler decides whether to
/// try again next tick (§4.2 point 4).
#[async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &'static str;
    async fn get_short(&self, token: &CancellationToken) -> Result<()>;
    async fn get_long(&self, token: &CancellationToken) -> Result<()>;
    async fn get_historic(&self, token: &CancellationToken) -> Result<()>;
}

/// Every adapter name the registry knows how to construct.
pub fn available_exchanges() -> &'static [&'static str] {
    &["bittrex", "bittrexusd", "binance", "bleutrade", "poloniex"]
}

/// Constructs one collector per enabled name, skipping (and logging) any
/// whose construction fails. Unknown names are ignored.
pub async fn construct_enabled(store: &Store, disabled: &[String]) -> Vec<Arc<dyn Collector>> {
    let mut collectors: Vec<Arc<dyn Collector>> = Vec::new();

    for name in available_exchanges() {
        if disabled.iter().any(|d| d.eq_ignore_ascii_case(name)) {
            tracing::info!(exchange = %name, "exchange disabled by configuration");
            continue;
        }

        let built: Result<Arc<dyn Collector>> = match *name {
            "bittrex" => bittrex::Bittrex::construct(store.clone())
                .await
                .map(|a| Arc::new(a) as Arc<dyn Collector>),
            "bittrexusd" => bittrex_usd::BittrexUsd::construct(store.clone())
                .await
                .map(|a| Arc::new(a) as Arc<dyn Collector>),
            "binance" => binance::Binance::construct(store.clone())
                .await
                .map(|a| Arc::new(a) as Arc<dyn Collector>),
            "bleutrade" => bleutrade::Bleutrade::construct(store.clone())
                .await
                .map(|a| Arc::new(a) as Arc<dyn Collector>),
            "poloniex" => poloniex::Poloniex::construct(store.clone())
                .await
                .map(|a| Arc::new(a) as Arc<dyn Collector>),
            _ => continue,
        };

        match built {
            Ok(collector) => collectors.push(collector),
            Err(e) => tracing::error!(exchange = %name, error = %e, "failed to construct adapter, skipping"),
        }
    }

    collectors
}
