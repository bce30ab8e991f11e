//! Keep-alive management for the feed connection.
//!
//! Sends the literal `"ping"` on a fixed interval while connected and
//! records the venue's `"pong"` replies. Pongs are informational only;
//! a missing pong does not tear the connection down.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::debug;

/// Heartbeat manager for the feed connection.
pub struct HeartbeatManager {
    /// How often to send a ping.
    interval_ms: u64,
    /// Last ping sent time.
    last_ping: RwLock<Option<DateTime<Utc>>>,
    /// Last pong received time.
    last_pong: RwLock<Option<DateTime<Utc>>>,
    /// Last frame received time (any frame).
    last_message: RwLock<DateTime<Utc>>,
    pings_sent: AtomicU64,
    pongs_received: AtomicU64,
}

impl HeartbeatManager {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_ping: RwLock::new(None),
            last_pong: RwLock::new(None),
            last_message: RwLock::new(Utc::now()),
            pings_sent: AtomicU64::new(0),
            pongs_received: AtomicU64::new(0),
        }
    }

    /// Reset per-connection state (called on open).
    pub fn reset(&self) {
        *self.last_ping.write() = None;
        *self.last_pong.write() = None;
        *self.last_message.write() = Utc::now();
    }

    /// Ping timer for one connection. The first tick fires one full
    /// interval after open; dropping the timer cancels it.
    pub fn ticker(&self) -> Interval {
        let period = Duration::from_millis(self.interval_ms.max(1));
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    pub fn record_ping(&self) {
        let now = Utc::now();
        *self.last_ping.write() = Some(now);
        self.pings_sent.fetch_add(1, Ordering::Relaxed);
        debug!(time = %now, "Sent keep-alive ping");
    }

    pub fn record_pong(&self) {
        let now = Utc::now();
        *self.last_pong.write() = Some(now);
        self.pongs_received.fetch_add(1, Ordering::Relaxed);

        if let Some(ping_time) = *self.last_ping.read() {
            let rtt_ms = (now - ping_time).num_milliseconds();
            debug!(rtt_ms, "Received pong");
        }
    }

    /// Record that any frame was received.
    pub fn record_message(&self) {
        *self.last_message.write() = Utc::now();
    }

    pub fn time_since_last_message_ms(&self) -> i64 {
        (Utc::now() - *self.last_message.read()).num_milliseconds()
    }

    pub fn stats(&self) -> HeartbeatStats {
        HeartbeatStats {
            last_ping: *self.last_ping.read(),
            last_pong: *self.last_pong.read(),
            last_message: *self.last_message.read(),
            pings_sent: self.pings_sent.load(Ordering::Relaxed),
            pongs_received: self.pongs_received.load(Ordering::Relaxed),
            time_since_last_message_ms: self.time_since_last_message_ms(),
        }
    }
}

/// Heartbeat statistics.
#[derive(Debug, Clone)]
pub struct HeartbeatStats {
    pub last_ping: Option<DateTime<Utc>>,
    pub last_pong: Option<DateTime<Utc>>,
    pub last_message: DateTime<Utc>,
    pub pings_sent: u64,
    pub pongs_received: u64,
    pub time_since_last_message_ms: i64,
}
