//! Mempool Collector (§4.6): push-driven, fed by node RPC block/tx
//! callbacks rather than a timer.

pub mod rpc;

use crate::store::{Block, MempoolDatum, Store, Vote};
use chrono::TimeZone;
use rpc::{RpcClient, RpcEvent};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Running tally since the last persisted snapshot.
#[derive(Default)]
struct Accumulator {
    count: i64,
    size_bytes: i64,
    total_fee: f64,
    votes: i64,
    tickets: i64,
    revocations: i64,
    regular: i64,
}

impl Accumulator {
    fn record(&mut self, tx: &rpc::TxInfo) {
        self.count += 1;
        self.size_bytes += tx.size;
        self.total_fee += tx.fee;
        match tx.tx_type.as_str() {
            "vote" => self.votes += 1,
            "ticket" => self.tickets += 1,
            "revocation" => self.revocations += 1,
            _ => self.regular += 1,
        }
    }

    fn take(&mut self) -> MempoolDatum {
        let datum = MempoolDatum {
            time: chrono::Utc::now(),
            number_of_transactions: self.count,
            size_bytes: self.size_bytes,
            total_fee: self.total_fee,
            votes: self.votes,
            tickets: self.tickets,
            revocations: self.revocations,
            regular_transactions: self.regular,
        };
        *self = Accumulator::default();
        datum
    }
}

pub struct MempoolCollector {
    store: Store,
    rpc: RpcClient,
    events: mpsc::Receiver<RpcEvent>,
    snapshot_interval: Duration,
}

impl MempoolCollector {
    /// Bounded channel: the RPC socket read loop is never blocked by a
    /// slow Store round trip (§9 design note). A full channel means the
    /// collector is behind; the oldest-undelivered notification is simply
    /// never sent (the `mpsc::Sender::send` used by the RPC client is
    /// async and will itself apply backpressure rather than drop, which is
    /// acceptable here since RPC delivery is already best-effort).
    pub fn new(store: Store, host: &str, user: &str, pass: &str, snapshot_interval_secs: u64) -> Self {
        let (event_tx, events) = mpsc::channel(1024);
        let rpc = RpcClient::new(host, user, pass, event_tx);
        Self {
            store,
            rpc,
            events,
            snapshot_interval: Duration::from_secs(snapshot_interval_secs),
        }
    }

    fn store_block_and_votes(&self, block: &rpc::BlockInfo) {
        let stored = self.store.store_block(&Block {
            height: block.height,
            hash: block.hash.clone(),
            time: chrono::Utc
                .timestamp_opt(block.time, 0)
                .single()
                .unwrap_or_else(chrono::Utc::now),
        });
        if let Err(e) = stored {
            warn!(height = block.height, error = %e, "failed to store block, skipping");
            return;
        }

        for vote in &block.votes {
            if let Err(e) = self.store.store_vote(&Vote {
                ticket_hash: vote.ticket_hash.clone(),
                block_voted: vote.block_height,
                block_hash: vote.block_hash.clone(),
                time: chrono::Utc::now(),
            }) {
                warn!(ticket = %vote.ticket_hash, error = %e, "failed to store vote, skipping");
            }
        }
    }

    /// Runs the RPC connection and the event-draining worker concurrently
    /// under one cancellation token. Returns once both have stopped.
    pub async fn run(mut self, token: CancellationToken) {
        let rpc = self.rpc;
        let rpc_token = token.clone();
        let rpc_task = tokio::spawn(async move {
            tokio::select! {
                _ = rpc_token.cancelled() => {}
                _ = rpc.run() => {}
            }
        });

        info!("mempool collector started");
        let mut accumulator = Accumulator::default();
        let mut last_snapshot = Instant::now();

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                maybe_event = self.events.recv() => {
                    match maybe_event {
                        None => break,
                        Some(RpcEvent::TxAccepted(tx)) => {
                            accumulator.record(&tx);
                            if last_snapshot.elapsed() >= self.snapshot_interval {
                                let datum = accumulator.take();
                                if let Err(e) = self.store.store_mempool_datum(&datum) {
                                    error!(error = %e, "failed to store mempool snapshot");
                                }
                                last_snapshot = Instant::now();
                            }
                        }
                        Some(RpcEvent::BlockConnected(block)) => {
                            self.store_block_and_votes(&block);
                        }
                    }
                }
            }
        }

        info!("mempool collector shutting down");
        rpc_task.abort();
        let _ = rpc_task.await;
    }
}
