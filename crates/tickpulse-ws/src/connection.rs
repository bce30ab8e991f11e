//! Feed connection driver.
//!
//! Runs the transport lifecycle for one instrument: connect, subscribe to
//! ticker and trade channels, keep-alive, and reconnect on close after a
//! fixed delay. Transitions are decided by [`ConnectionFsm`]; this module
//! only performs the I/O. Decoded payloads and state changes are emitted
//! as [`FeedEvent`]s on an mpsc channel.

use crate::error::{WsError, WsResult};
use crate::fsm::{ConnectDecision, ConnectionFsm, FsmAction};
use crate::heartbeat::{HeartbeatManager, HeartbeatStats};
use crate::message::{
    decode_frame, ChannelPayload, InboundFrame, SubscribeRequest, HEARTBEAT_PING,
};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tickpulse_core::ConnectionState;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Feed connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// WebSocket URL.
    pub url: String,
    /// Instrument identifier (e.g. "ETHUSDT").
    pub symbol: String,
    /// Instrument class sent as `instType` (e.g. "mc").
    pub inst_type: String,
    /// Fixed delay between a close and the next attempt.
    pub reconnect_delay_ms: u64,
    /// Keep-alive interval.
    pub heartbeat_interval_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            symbol: String::new(),
            inst_type: "mc".to_string(),
            reconnect_delay_ms: 5000,
            heartbeat_interval_ms: 30000,
        }
    }
}

/// Events emitted by the feed client.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Connection state changed.
    State(ConnectionState),
    /// Market data for a subscribed channel.
    Payload(ChannelPayload),
}

/// Inbound frame counters over the client's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Text frames received.
    pub received: u64,
    /// Text frames that were not valid JSON.
    pub malformed: u64,
}

/// How a single connection ended.
#[derive(Debug)]
enum SessionEnd {
    /// Remote close or stream end; schedule a reconnect.
    Closed,
    /// Closed on purpose to open a fresh connection right away.
    Reopen,
    /// Client shut down.
    Shutdown,
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = futures_util::stream::SplitSink<WsStream, Message>;

/// Feed client for one instrument.
pub struct FeedClient {
    config: FeedConfig,
    fsm: Arc<RwLock<ConnectionFsm>>,
    heartbeat: Arc<HeartbeatManager>,
    event_tx: mpsc::Sender<FeedEvent>,
    frames_received: AtomicU64,
    frames_malformed: AtomicU64,
    /// Set while a connect loop owns the transport.
    loop_active: AtomicBool,
    /// Wakes the connect loop for `RetryNow` / `ReopenExisting`. A request
    /// made while the loop is busy is kept as a permit until it next waits.
    connect_requested: Notify,
    /// Cancellation token for teardown.
    shutdown_token: CancellationToken,
}

impl FeedClient {
    pub fn new(config: FeedConfig, event_tx: mpsc::Sender<FeedEvent>) -> Self {
        let fsm = ConnectionFsm::new(
            Duration::from_millis(config.reconnect_delay_ms),
            Duration::from_millis(config.heartbeat_interval_ms),
        );
        Self {
            heartbeat: Arc::new(HeartbeatManager::new(config.heartbeat_interval_ms)),
            config,
            fsm: Arc::new(RwLock::new(fsm)),
            event_tx,
            frames_received: AtomicU64::new(0),
            frames_malformed: AtomicU64::new(0),
            loop_active: AtomicBool::new(false),
            connect_requested: Notify::new(),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.config.symbol
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.fsm.read().state()
    }

    /// Reconnects scheduled since this client was created.
    pub fn reconnects_scheduled(&self) -> u64 {
        self.fsm.read().reconnects_scheduled()
    }

    pub fn heartbeat_stats(&self) -> HeartbeatStats {
        self.heartbeat.stats()
    }

    pub fn frame_stats(&self) -> FrameStats {
        FrameStats {
            received: self.frames_received.load(Ordering::Relaxed),
            malformed: self.frames_malformed.load(Ordering::Relaxed),
        }
    }

    /// Tear the connection down. Cancels the heartbeat and any pending
    /// reconnect; the running `connect` future returns shortly after.
    pub fn disconnect(&self) {
        info!(symbol = %self.config.symbol, "Feed disconnect requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect and keep the connection alive until `disconnect`.
    ///
    /// Guarded: while an attempt is in flight this is a no-op; while
    /// connected the live connection is closed and reopened; while a
    /// reconnect is pending it runs immediately. In all three cases the
    /// call returns at once and the already-running loop does the work.
    pub async fn connect(&self) -> WsResult<()> {
        if self.is_shutdown() {
            return Err(WsError::ConnectionFailed("client was disconnected".to_string()));
        }

        let decision = self.fsm.write().request_connect();
        match decision {
            ConnectDecision::AlreadyConnecting => {
                debug!(symbol = %self.config.symbol, "Connect already in progress, ignoring");
                return Ok(());
            }
            ConnectDecision::ReopenExisting => {
                info!(symbol = %self.config.symbol, "Closing existing connection before reopening");
                self.connect_requested.notify_one();
                return Ok(());
            }
            ConnectDecision::RetryNow => {
                debug!(symbol = %self.config.symbol, "Reconnect pending, retrying now");
                self.connect_requested.notify_one();
                return Ok(());
            }
            ConnectDecision::Open => {}
        }

        if self.loop_active.swap(true, Ordering::SeqCst) {
            debug!("Connect loop already running");
            return Ok(());
        }
        let result = self.connect_with_retry().await;
        self.loop_active.store(false, Ordering::SeqCst);
        result
    }

    async fn connect_with_retry(&self) -> WsResult<()> {
        loop {
            if self.is_shutdown() {
                return self.finish_shutdown().await;
            }

            self.fsm.write().begin_attempt();
            self.emit(FeedEvent::State(ConnectionState::Connecting)).await;

            let end = match self.try_connect().await {
                Ok(end) => end,
                Err(e) => {
                    warn!(?e, symbol = %self.config.symbol, "Feed connection error");
                    // Disconnected is published once the close is handled below
                    self.fsm.write().on_error();
                    SessionEnd::Closed
                }
            };

            match end {
                SessionEnd::Shutdown => return self.finish_shutdown().await,
                SessionEnd::Reopen => {
                    self.fsm.write().on_reopen();
                    continue;
                }
                SessionEnd::Closed => {}
            }

            let plan = self.fsm.write().on_close();
            self.emit(FeedEvent::State(ConnectionState::Disconnected)).await;
            warn!(
                attempt = plan.attempt,
                delay_ms = plan.delay.as_millis() as u64,
                "Feed disconnected, reconnect scheduled"
            );

            tokio::select! {
                () = tokio::time::sleep(plan.delay) => {
                    info!(attempt = plan.attempt, "Attempting to reconnect");
                }
                () = self.connect_requested.notified() => {
                    info!(attempt = plan.attempt, "Reconnect requested, skipping remaining delay");
                }
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during reconnect delay");
                    return self.finish_shutdown().await;
                }
            }
        }
    }

    async fn finish_shutdown(&self) -> WsResult<()> {
        self.fsm.write().on_shutdown();
        self.emit(FeedEvent::State(ConnectionState::Disconnected)).await;
        info!(symbol = %self.config.symbol, "Feed client stopped");
        Ok(())
    }

    async fn try_connect(&self) -> WsResult<SessionEnd> {
        info!(url = %self.config.url, symbol = %self.config.symbol, "Connecting to feed");

        let connected = tokio::select! {
            res = connect_async_tls_with_config(self.config.url.as_str(), None, true, None) => res,
            () = self.shutdown_token.cancelled() => return Ok(SessionEnd::Shutdown),
        };
        let (ws_stream, _response) = connected?;
        let (mut write, mut read) = ws_stream.split();

        let actions = self.fsm.write().on_open();
        info!(symbol = %self.config.symbol, "Feed connected");
        self.emit(FeedEvent::State(ConnectionState::Connected)).await;

        let mut ping_timer = None;
        for action in actions {
            match action {
                FsmAction::Subscribe(channel) => {
                    let req =
                        SubscribeRequest::single(&self.config.inst_type, channel, &self.config.symbol);
                    write.send(Message::Text(req.to_json()?)).await?;
                    debug!(%channel, symbol = %self.config.symbol, "Subscription sent");
                }
                FsmAction::StartHeartbeat(interval) => {
                    self.heartbeat.reset();
                    ping_timer = Some(self.heartbeat.ticker());
                    debug!(interval_ms = interval.as_millis() as u64, "Heartbeat started");
                }
            }
        }
        let Some(mut ping_timer) = ping_timer else {
            return Err(WsError::ConnectionFailed("heartbeat not started".to_string()));
        };

        loop {
            tokio::select! {
                biased;

                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in message loop");
                    close_quietly(&mut write).await;
                    return Ok(SessionEnd::Shutdown);
                }

                () = self.connect_requested.notified() => {
                    info!("Reopen requested, closing current connection");
                    close_quietly(&mut write).await;
                    return Ok(SessionEnd::Reopen);
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_message(&text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (u16::from(f.code), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "Feed closed by server");
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            error!(?e, "Feed read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("Feed stream ended");
                            return Ok(SessionEnd::Closed);
                        }
                        _ => {}
                    }
                }

                _ = ping_timer.tick() => {
                    write.send(Message::Text(HEARTBEAT_PING.to_string())).await?;
                    self.heartbeat.record_ping();
                }
            }
        }
    }

    /// Decode one text frame and forward market data. Never fails: a
    /// malformed frame is logged and dropped without touching the
    /// connection.
    async fn handle_text_message(&self, text: &str) {
        self.heartbeat.record_message();
        self.frames_received.fetch_add(1, Ordering::Relaxed);

        match decode_frame(text) {
            Ok(InboundFrame::Pong) => self.heartbeat.record_pong(),
            Ok(InboundFrame::Data(payload)) => self.emit(FeedEvent::Payload(payload)).await,
            Ok(InboundFrame::Event { event, code, msg }) => {
                if event == "error" {
                    warn!(?code, msg = msg.as_deref().unwrap_or(""), "Venue reported error");
                } else {
                    debug!(%event, "Venue event");
                }
            }
            Ok(InboundFrame::Unrecognized) => {
                trace!(len = text.len(), "Dropping unrecognized frame");
            }
            Err(e) => {
                self.frames_malformed.fetch_add(1, Ordering::Relaxed);
                warn!(?e, "Message parsing error");
            }
        }
    }

    async fn emit(&self, event: FeedEvent) {
        if self.event_tx.send(event).await.is_err() {
            warn!("Feed event receiver dropped");
        }
    }
}

async fn close_quietly(write: &mut WsSink) {
    if let Err(e) = write.send(Message::Close(None)).await {
        warn!(?e, "Failed to send Close frame");
    }
}
