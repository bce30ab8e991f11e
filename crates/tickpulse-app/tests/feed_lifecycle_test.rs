//! Feed client lifecycle integration tests.
//!
//! Tests the connection lifecycle against a mock venue:
//! - Connection establishment and subscription order
//! - Market data delivery
//! - Reconnection after a server close
//! - Malformed frame handling
//! - Keep-alive over the wire
//! - Reopen requests while the driver is busy
//! - Clean disconnect

mod integration;
use integration::common::eventually;
use integration::common::mock_ws::{MockWsServer, Subscription};

use std::sync::Arc;
use std::time::Duration;
use tickpulse_ws::{ChannelPayload, ConnectionState, FeedClient, FeedConfig, FeedEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn client_config(url: String, reconnect_delay_ms: u64) -> FeedConfig {
    FeedConfig {
        url,
        symbol: "ETHUSDT".to_string(),
        reconnect_delay_ms,
        ..Default::default()
    }
}

fn spawn_client(
    config: FeedConfig,
    event_capacity: usize,
) -> (Arc<FeedClient>, mpsc::Receiver<FeedEvent>, JoinHandle<()>) {
    let (event_tx, event_rx) = mpsc::channel(event_capacity);
    let client = Arc::new(FeedClient::new(config, event_tx));

    let runner = client.clone();
    let handle = tokio::spawn(async move {
        let _ = runner.connect().await;
    });
    (client, event_rx, handle)
}

fn start_client(
    server: &MockWsServer,
    reconnect_delay_ms: u64,
) -> (Arc<FeedClient>, mpsc::Receiver<FeedEvent>, JoinHandle<()>) {
    spawn_client(client_config(server.url(), reconnect_delay_ms), 256)
}

/// Next market data payload, skipping state events.
async fn next_payload(events: &mut mpsc::Receiver<FeedEvent>) -> Option<ChannelPayload> {
    timeout(WAIT, async {
        while let Some(event) = events.recv().await {
            if let FeedEvent::Payload(payload) = event {
                return Some(payload);
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
}

/// Wait until the client reports `state` through its event channel.
async fn wait_for_state(events: &mut mpsc::Receiver<FeedEvent>, state: ConnectionState) -> bool {
    timeout(WAIT, async {
        while let Some(event) = events.recv().await {
            if event == FeedEvent::State(state) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false)
}

fn sub(channel: &str, inst_id: &str) -> Subscription {
    Subscription {
        channel: channel.to_string(),
        inst_id: inst_id.to_string(),
    }
}

/// Test that the client connects and subscribes ticker first, then trade.
#[tokio::test]
async fn test_feed_subscribes_ticker_then_trade() {
    let server = MockWsServer::start().await;
    let (client, mut events, handle) = start_client(&server, 5_000);

    assert!(wait_for_state(&mut events, ConnectionState::Connecting).await);
    assert!(wait_for_state(&mut events, ConnectionState::Connected).await);

    let subscribed = eventually(WAIT, || async { server.subscriptions().await.len() >= 2 }).await;
    assert!(subscribed, "Both subscriptions should arrive");
    assert_eq!(
        server.subscriptions().await,
        vec![sub("ticker", "ETHUSDT"), sub("trade", "ETHUSDT")]
    );

    let raw = server.received_messages().await;
    let first: serde_json::Value = serde_json::from_str(&raw[0]).unwrap();
    assert_eq!(first["args"][0]["instType"], "mc");
    assert_eq!(first["args"].as_array().unwrap().len(), 1);
    assert_eq!(client.state(), ConnectionState::Connected);

    client.disconnect();
    let _ = timeout(WAIT, handle).await;
    server.shutdown().await;
}

/// Test that ticker and trade frames are forwarded as channel payloads.
#[tokio::test]
async fn test_feed_forwards_market_data() {
    let server = MockWsServer::start().await;
    let (client, mut events, handle) = start_client(&server, 5_000);

    assert!(eventually(WAIT, || async { server.subscriptions().await.len() >= 2 }).await);

    server.push_ticker("ETHUSDT", "2500.5");
    match next_payload(&mut events).await {
        Some(ChannelPayload::Ticker { inst_id, payload }) => {
            assert_eq!(inst_id.as_deref(), Some("ETHUSDT"));
            assert_eq!(payload["last"], "2500.5");
        }
        other => panic!("Expected ticker payload, got {other:?}"),
    }

    server.push_trades("ETHUSDT", &["2500.6", "2500.4"]);
    match next_payload(&mut events).await {
        Some(ChannelPayload::Trades { payloads, .. }) => {
            assert_eq!(payloads.len(), 2);
            assert_eq!(payloads[0]["px"], "2500.6");
            assert_eq!(payloads[1]["px"], "2500.4");
        }
        other => panic!("Expected trade payload, got {other:?}"),
    }

    client.disconnect();
    let _ = timeout(WAIT, handle).await;
    server.shutdown().await;
}

/// Test that a server-side close leads to a reconnect and fresh subscriptions.
#[tokio::test]
async fn test_feed_reconnects_after_server_close() {
    let server = MockWsServer::start().await;
    let (client, mut events, handle) = start_client(&server, 100);

    assert!(wait_for_state(&mut events, ConnectionState::Connected).await);
    assert!(eventually(WAIT, || async { server.subscriptions().await.len() >= 2 }).await);

    server.close_connections();
    assert!(wait_for_state(&mut events, ConnectionState::Disconnected).await);
    assert!(wait_for_state(&mut events, ConnectionState::Connected).await);

    let resubscribed = eventually(WAIT, || async { server.subscriptions().await.len() >= 4 }).await;
    assert!(resubscribed, "Subscriptions should be re-sent after reconnect");
    assert_eq!(server.connection_count().await, 2);
    assert_eq!(client.reconnects_scheduled(), 1);

    let subs = server.subscriptions().await;
    assert_eq!(subs[2..], [sub("ticker", "ETHUSDT"), sub("trade", "ETHUSDT")]);

    client.disconnect();
    let _ = timeout(WAIT, handle).await;
    server.shutdown().await;
}

/// Test that a malformed frame is dropped without closing the connection.
#[tokio::test]
async fn test_feed_survives_malformed_frame() {
    let server = MockWsServer::start().await;
    let (client, mut events, handle) = start_client(&server, 100);

    assert!(eventually(WAIT, || async { server.subscriptions().await.len() >= 2 }).await);

    server.push_text("{not json");
    server.push_ticker("ETHUSDT", "101");

    let payload = next_payload(&mut events).await;
    assert!(matches!(payload, Some(ChannelPayload::Ticker { .. })));
    assert_eq!(client.frame_stats().malformed, 1);
    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(server.connection_count().await, 1);
    assert_eq!(client.reconnects_scheduled(), 0);

    client.disconnect();
    let _ = timeout(WAIT, handle).await;
    server.shutdown().await;
}

/// Test that disconnect stops the client and reports DISCONNECTED.
#[tokio::test]
async fn test_feed_disconnect_stops_client() {
    let server = MockWsServer::start().await;
    let (client, mut events, handle) = start_client(&server, 100);

    assert!(wait_for_state(&mut events, ConnectionState::Connected).await);

    client.disconnect();
    assert!(wait_for_state(&mut events, ConnectionState::Disconnected).await);
    assert!(timeout(WAIT, handle).await.is_ok(), "Client task should finish");
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(client.is_shutdown());

    // No reconnect after an explicit disconnect
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(server.connection_count().await, 1);

    server.shutdown().await;
}

/// Test that keep-alive pings go over the wire, pongs are counted, and
/// pings stop after disconnect.
#[tokio::test]
async fn test_feed_heartbeat_ping_pong() {
    let server = MockWsServer::start().await;
    let config = FeedConfig {
        heartbeat_interval_ms: 100,
        ..client_config(server.url(), 100)
    };
    let (client, mut events, handle) = spawn_client(config, 256);
    assert!(wait_for_state(&mut events, ConnectionState::Connected).await);

    let pinged = eventually(WAIT, || async { server.ping_count().await >= 2 }).await;
    assert!(pinged, "Server should receive keep-alive pings");
    let ponged = eventually(WAIT, || async {
        client.heartbeat_stats().pongs_received >= 1
    })
    .await;
    assert!(ponged, "Client should record pong replies");
    assert!(client.heartbeat_stats().pings_sent >= 2);
    // Keep-alives are not subscriptions
    assert_eq!(server.subscriptions().await.len(), 2);

    client.disconnect();
    assert!(timeout(WAIT, handle).await.is_ok());
    let sent = client.heartbeat_stats().pings_sent as usize;
    assert!(eventually(WAIT, || async { server.ping_count().await == sent }).await);
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(server.ping_count().await, sent);
    assert_eq!(client.heartbeat_stats().pings_sent as usize, sent);

    server.shutdown().await;
}

/// Test that failed opens keep scheduling reconnects with no cap, each
/// attempt reporting CONNECTING then DISCONNECTED.
#[tokio::test]
async fn test_feed_retries_failed_opens_without_cap() {
    // Grab a free port, then close it so every connect is refused
    let url = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        format!("ws://{}", listener.local_addr().unwrap())
    };
    let (client, mut events, handle) = spawn_client(client_config(url, 20), 256);

    let mut states = Vec::new();
    let collected = timeout(WAIT, async {
        while states.len() < 12 {
            match events.recv().await {
                Some(FeedEvent::State(state)) => states.push(state),
                Some(FeedEvent::Payload(_)) => {}
                None => break,
            }
        }
    })
    .await;
    assert!(collected.is_ok(), "Attempts should keep coming");
    assert_eq!(states.len(), 12);
    for pair in states.chunks(2) {
        assert_eq!(
            pair,
            [ConnectionState::Connecting, ConnectionState::Disconnected]
        );
    }

    let seen = client.reconnects_scheduled();
    assert!(seen >= 6);
    let grew = eventually(WAIT, || {
        let now = client.reconnects_scheduled();
        async move { now >= seen + 5 }
    })
    .await;
    assert!(grew, "Reconnects should keep being scheduled");

    // Drain so the driver never blocks on a full channel
    tokio::spawn(async move { while events.recv().await.is_some() {} });
    client.disconnect();
    assert!(timeout(WAIT, handle).await.is_ok());
}

/// Test that a reopen request made while the driver is blocked publishing
/// an event is not lost.
#[tokio::test]
async fn test_feed_reopen_request_while_driver_busy() {
    let server = MockWsServer::start().await;
    // Capacity 1: the driver stalls on emitting CONNECTED until drained
    let (client, mut events, handle) = spawn_client(client_config(server.url(), 5_000), 1);

    let connected = eventually(WAIT, || {
        let state = client.state();
        async move { state == ConnectionState::Connected }
    })
    .await;
    assert!(connected);

    client.connect().await.unwrap();
    tokio::spawn(async move { while events.recv().await.is_some() {} });

    let reopened = eventually(WAIT, || async { server.connection_count().await >= 2 }).await;
    assert!(reopened, "Reopen request should close and reopen the connection");
    assert!(eventually(WAIT, || async { server.subscriptions().await.len() >= 4 }).await);
    // A reopen is not a reconnect after a close
    assert_eq!(client.reconnects_scheduled(), 0);

    client.disconnect();
    let _ = timeout(WAIT, handle).await;
    server.shutdown().await;
}
