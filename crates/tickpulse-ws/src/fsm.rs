//! Connection state machine.
//!
//! Pure transition logic for the feed transport, kept apart from the
//! socket so the connect guard and reconnect policy can be tested
//! without a network. The driver in `connection.rs` executes the
//! returned actions.
//!
//! Reconnect policy: every close schedules exactly one attempt after a
//! fixed delay. There is no backoff, jitter or attempt cap.

use crate::message::ChannelKind;
use std::time::Duration;
use tickpulse_core::ConnectionState;
use tracing::debug;

/// Outcome of a `connect` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectDecision {
    /// Idle: open a new connection.
    Open,
    /// An attempt is already in flight; the request is a no-op.
    AlreadyConnecting,
    /// A live connection exists; close it, then open a new one.
    ReopenExisting,
    /// A reconnect is pending; run it now instead of waiting.
    RetryNow,
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsmAction {
    /// Send a subscribe request for this channel.
    Subscribe(ChannelKind),
    /// Start sending keep-alives at this interval.
    StartHeartbeat(Duration),
}

/// A scheduled reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPlan {
    /// Consecutive attempts since the last successful open (1-based).
    pub attempt: u32,
    pub delay: Duration,
}

/// Feed transport state machine.
#[derive(Debug, Clone)]
pub struct ConnectionFsm {
    state: ConnectionState,
    reconnect_delay: Duration,
    heartbeat_interval: Duration,
    reconnect_pending: bool,
    consecutive_failures: u32,
    reconnects_scheduled: u64,
}

impl ConnectionFsm {
    pub fn new(reconnect_delay: Duration, heartbeat_interval: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            reconnect_delay,
            heartbeat_interval,
            reconnect_pending: false,
            consecutive_failures: 0,
            reconnects_scheduled: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Total reconnects scheduled over the lifetime of this machine.
    pub fn reconnects_scheduled(&self) -> u64 {
        self.reconnects_scheduled
    }

    /// Guard an external connect request.
    pub fn request_connect(&mut self) -> ConnectDecision {
        match self.state {
            ConnectionState::Connecting => ConnectDecision::AlreadyConnecting,
            ConnectionState::Connected => ConnectDecision::ReopenExisting,
            ConnectionState::Disconnected if self.reconnect_pending => ConnectDecision::RetryNow,
            ConnectionState::Disconnected => {
                self.state = ConnectionState::Connecting;
                ConnectDecision::Open
            }
        }
    }

    /// A connection attempt is starting (initial, retry, or reopen).
    pub fn begin_attempt(&mut self) {
        self.reconnect_pending = false;
        self.state = ConnectionState::Connecting;
    }

    /// The transport opened.
    pub fn on_open(&mut self) -> Vec<FsmAction> {
        self.state = ConnectionState::Connected;
        self.reconnect_pending = false;
        self.consecutive_failures = 0;

        let mut actions: Vec<FsmAction> = ChannelKind::ALL
            .iter()
            .copied()
            .map(FsmAction::Subscribe)
            .collect();
        actions.push(FsmAction::StartHeartbeat(self.heartbeat_interval));
        actions
    }

    /// Transport error. Reconnect is left to the close that follows.
    pub fn on_error(&mut self) {
        self.state = ConnectionState::Disconnected;
    }

    /// Transport closed (including after an error).
    pub fn on_close(&mut self) -> ReconnectPlan {
        self.state = ConnectionState::Disconnected;
        self.reconnect_pending = true;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.reconnects_scheduled += 1;

        let plan = ReconnectPlan {
            attempt: self.consecutive_failures,
            delay: self.reconnect_delay,
        };
        debug!(attempt = plan.attempt, delay_ms = plan.delay.as_millis() as u64, "Reconnect scheduled");
        plan
    }

    /// A live connection was closed on purpose to be reopened.
    pub fn on_reopen(&mut self) {
        self.state = ConnectionState::Connecting;
        self.reconnect_pending = false;
    }

    /// Teardown: no reconnect follows.
    pub fn on_shutdown(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.reconnect_pending = false;
    }
}
