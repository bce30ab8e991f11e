//! Mock venue WebSocket server for integration tests.
//!
//! Provides a simple WebSocket server that can:
//! - Accept connections and count them
//! - Record subscribe requests
//! - Record and answer the text `"ping"` keep-alive with `"pong"`
//! - Push frames to, or close, every open connection

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// One `(channel, instId)` pair from a subscribe request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub channel: String,
    pub inst_id: String,
}

#[derive(Debug, Clone)]
enum Push {
    Text(String),
    Close,
}

/// A mock WebSocket server for testing.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    push_tx: broadcast::Sender<Push>,
    messages: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<u32>>,
}

impl MockWsServer {
    /// Start a new mock WebSocket server on an available port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let messages: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let connections: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (push_tx, _) = broadcast::channel::<Push>(64);

        let messages_clone = messages.clone();
        let connections_clone = connections.clone();
        let push_clone = push_tx.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(
                            stream,
                            messages_clone.clone(),
                            connections_clone.clone(),
                            push_clone.subscribe(),
                        ));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            push_tx,
            messages,
            connections,
        }
    }

    /// Get the server's WebSocket URL.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Get the number of connections received.
    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    /// Get all received text messages, in arrival order.
    pub async fn received_messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }

    /// Number of `"ping"` keep-alives received.
    pub async fn ping_count(&self) -> usize {
        self.messages
            .lock()
            .await
            .iter()
            .filter(|text| text.as_str() == "ping")
            .count()
    }

    /// Subscriptions received so far, in arrival order.
    pub async fn subscriptions(&self) -> Vec<Subscription> {
        self.received_messages()
            .await
            .iter()
            .filter_map(|text| serde_json::from_str::<Value>(text).ok())
            .filter(|v| v["op"] == "subscribe")
            .filter_map(|v| {
                let arg = v["args"].get(0)?;
                Some(Subscription {
                    channel: arg["channel"].as_str()?.to_string(),
                    inst_id: arg["instId"].as_str()?.to_string(),
                })
            })
            .collect()
    }

    /// Send a raw text frame to every open connection.
    pub fn push_text(&self, text: impl Into<String>) {
        let _ = self.push_tx.send(Push::Text(text.into()));
    }

    /// Push a ticker frame for `inst_id` with the given last price.
    pub fn push_ticker(&self, inst_id: &str, last: &str) {
        self.push_text(ticker_frame(inst_id, last));
    }

    /// Push a trade frame for `inst_id` with one print per price.
    pub fn push_trades(&self, inst_id: &str, prices: &[&str]) {
        self.push_text(trade_frame(inst_id, prices));
    }

    /// Close every open connection from the server side.
    pub fn close_connections(&self) {
        let _ = self.push_tx.send(Push::Close);
    }

    /// Shutdown the server.
    pub async fn shutdown(self) {
        self.close_connections();
        let _ = self.shutdown_tx.send(()).await;
    }
}

pub fn ticker_frame(inst_id: &str, last: &str) -> String {
    json!({
        "action": "snapshot",
        "arg": { "instType": "mc", "channel": "ticker", "instId": inst_id },
        "data": [{ "instId": inst_id, "last": last }]
    })
    .to_string()
}

pub fn trade_frame(inst_id: &str, prices: &[&str]) -> String {
    let data: Vec<Value> = prices
        .iter()
        .map(|px| json!({ "px": px, "sz": "0.1", "side": "buy" }))
        .collect();
    json!({
        "action": "update",
        "arg": { "instType": "mc", "channel": "trade", "instId": inst_id },
        "data": data
    })
    .to_string()
}

async fn handle_connection(
    stream: TcpStream,
    messages: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<u32>>,
    mut push_rx: broadcast::Receiver<Push>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    {
        let mut count = connections.lock().await;
        *count += 1;
    }

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text == "ping" {
                            messages.lock().await.push(text);
                            let _ = write.send(Message::Text("pong".to_string())).await;
                            continue;
                        }
                        let ack = serde_json::from_str::<Value>(&text)
                            .ok()
                            .filter(|v| v["op"] == "subscribe")
                            .map(|v| json!({ "event": "subscribe", "arg": v["args"][0] }));
                        messages.lock().await.push(text);
                        if let Some(ack) = ack {
                            let _ = write.send(Message::Text(ack.to_string())).await;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            push = push_rx.recv() => {
                match push {
                    Ok(Push::Text(text)) => {
                        let _ = write.send(Message::Text(text)).await;
                    }
                    Ok(Push::Close) | Err(broadcast::error::RecvError::Closed) => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockWsServer::start().await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        server.shutdown().await;
    }

    #[test]
    fn test_ticker_frame_shape() {
        let v: Value = serde_json::from_str(&ticker_frame("ETHUSDT", "100.5")).unwrap();
        assert_eq!(v["arg"]["channel"], "ticker");
        assert_eq!(v["data"][0]["last"], "100.5");
    }
}
