//! Node RPC websocket client (§4.6): a reconnect-with-exponential-backoff
//! loop feeding decoded notifications to the collector over a channel.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// One notification pushed by the node, already separated from JSON-RPC
/// envelope noise.
#[derive(Debug, Clone)]
pub enum RpcEvent {
    TxAccepted(TxInfo),
    BlockConnected(BlockInfo),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxInfo {
    pub hash: String,
    #[serde(rename = "type")]
    pub tx_type: String, // "regular" | "vote" | "ticket" | "revocation"
    pub fee: f64,
    pub size: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockInfo {
    pub height: i64,
    pub hash: String,
    pub time: i64,
    pub votes: Vec<VoteInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoteInfo {
    pub ticket_hash: String,
    pub block_hash: String,
    pub block_height: i64,
}

#[derive(Debug, Deserialize)]
struct RpcNotification {
    method: String,
    params: serde_json::Value,
}

pub struct RpcClient {
    url: String,
    user: String,
    pass: String,
    event_tx: mpsc::Sender<RpcEvent>,
}

impl RpcClient {
    pub fn new(
        host: &str,
        user: &str,
        pass: &str,
        event_tx: mpsc::Sender<RpcEvent>,
    ) -> Self {
        Self {
            url: format!("wss://{host}/ws"),
            user: user.to_string(),
            pass: pass.to_string(),
            event_tx,
        }
    }

    /// Connects and streams forever, reconnecting with exponential backoff
    /// (capped at 60s) on any connection failure. Returns only when the
    /// cancellation token is observed, by way of the caller racing this
    /// future against `token.cancelled()` in a `select!`.
    pub async fn run(&self) {
        let mut reconnect_delay = Duration::from_secs(1);
        let max_delay = Duration::from_secs(60);

        loop {
            match self.connect_and_stream().await {
                Ok(_) => {
                    info!("node rpc connection closed gracefully");
                    reconnect_delay = Duration::from_secs(1);
                }
                Err(e) => {
                    error!(error = %e, "node rpc connection failed");
                    warn!(delay_secs = reconnect_delay.as_secs(), "reconnecting");
                    sleep(reconnect_delay).await;
                    reconnect_delay = (reconnect_delay * 2).min(max_delay);
                }
            }
        }
    }

    async fn connect_and_stream(&self) -> Result<()> {
        let mut request = self
            .url
            .clone()
            .into_client_request()
            .context("failed to build rpc websocket request")?;

        let credentials = format!(
            "Basic {}",
            BASE64.encode(format!("{}:{}", self.user, self.pass))
        );
        if let Ok(header) = credentials.parse() {
            request.headers_mut().insert("Authorization", header);
        }

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .context("failed to connect to node rpc")?;

        info!("connected to node rpc");

        let (mut write, mut read) = ws_stream.split();

        write
            .send(Message::Text(
                json!({
                    "jsonrpc": "1.0",
                    "id": 1,
                    "method": "notifynewtransactions",
                    "params": [true]
                })
                .to_string(),
            ))
            .await
            .context("failed to send notifynewtransactions")?;

        write
            .send(Message::Text(
                json!({
                    "jsonrpc": "1.0",
                    "id": 2,
                    "method": "notifyblocks",
                    "params": []
                })
                .to_string(),
            ))
            .await
            .context("failed to send notifyblocks")?;

        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => self.dispatch(&text).await,
                Ok(Message::Ping(payload)) => {
                    let _ = write.send(Message::Pong(payload)).await;
                }
                Ok(Message::Close(frame)) => {
                    info!(?frame, "node rpc closed the connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "node rpc read error");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn dispatch(&self, text: &str) {
        let notification: RpcNotification = match serde_json::from_str(text) {
            Ok(n) => n,
            Err(_) => {
                debug!("ignoring non-notification rpc message");
                return;
            }
        };

        let event = match notification.method.as_str() {
            "txacceptedverbose" => serde_json::from_value::<TxInfo>(notification.params)
                .ok()
                .map(RpcEvent::TxAccepted),
            "blockconnected" => serde_json::from_value::<BlockInfo>(notification.params)
                .ok()
                .map(RpcEvent::BlockConnected),
            _ => None,
        };

        if let Some(event) = event {
            // A closed store-side receiver (shutdown in progress) is not an
            // error worth logging above debug: the socket is being torn
            // down anyway.
            if self.event_tx.send(event).await.is_err() {
                debug!("event channel closed, dropping notification");
            }
        }
    }
}

