//! Integration tests for the Tick Hub's isolation and cancellation
//! properties (§8 invariants 4 and 5).

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dcrextdata::exchanges::{Collector, TickHub};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct FailingAdapter {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Collector for FailingAdapter {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn get_short(&self, _token: &CancellationToken) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("simulated HTTP 500"))
    }

    async fn get_long(&self, _token: &CancellationToken) -> Result<()> {
        Ok(())
    }

    async fn get_historic(&self, _token: &CancellationToken) -> Result<()> {
        Ok(())
    }
}

struct HealthyAdapter {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Collector for HealthyAdapter {
    fn name(&self) -> &'static str {
        "healthy"
    }

    async fn get_short(&self, _token: &CancellationToken) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_long(&self, _token: &CancellationToken) -> Result<()> {
        Ok(())
    }

    async fn get_historic(&self, _token: &CancellationToken) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn a_failing_adapter_does_not_block_its_siblings() {
    let failing_calls = Arc::new(AtomicUsize::new(0));
    let healthy_calls = Arc::new(AtomicUsize::new(0));

    let adapters: Vec<Arc<dyn Collector>> = vec![
        Arc::new(FailingAdapter {
            calls: failing_calls.clone(),
        }),
        Arc::new(HealthyAdapter {
            calls: healthy_calls.clone(),
        }),
    ];

    let hub = TickHub::new(adapters).expect("hub with two adapters");
    let token = CancellationToken::new();

    hub.collect_short(&token).await;

    assert_eq!(failing_calls.load(Ordering::SeqCst), 1);
    assert_eq!(healthy_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_adapter_set_is_a_hard_error() {
    let adapters: Vec<Arc<dyn Collector>> = Vec::new();
    assert!(TickHub::new(adapters).is_err());
}

#[tokio::test]
async fn cancellation_returns_promptly() {
    let adapters: Vec<Arc<dyn Collector>> = vec![Arc::new(HealthyAdapter {
        calls: Arc::new(AtomicUsize::new(0)),
    })];
    let hub = Arc::new(TickHub::new(adapters).unwrap());
    let token = CancellationToken::new();

    let run_token = token.clone();
    let run_hub = hub.clone();
    let handle = tokio::spawn(async move {
        run_hub.run(run_token).await;
    });

    token.cancel();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("hub run should return promptly after cancellation")
        .expect("hub task should not panic");
}
