//! Common data types for price tracking and momentum analysis.

use crate::Price;
use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Feed transport lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "DISCONNECTED"),
            Self::Connecting => write!(f, "CONNECTING"),
            Self::Connected => write!(f, "CONNECTED"),
        }
    }
}

/// One accepted price observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceTick {
    pub price: Price,
    /// Arrival time (unix ms).
    pub arrival_ms: i64,
}

impl PriceTick {
    pub fn new(price: Price, arrival_ms: i64) -> Self {
        Self { price, arrival_ms }
    }
}

/// A stored price move. Only created when the price actually changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceChangeRecord {
    /// Creation time (unix ms).
    pub time_ms: i64,
    /// Price after the move.
    pub price: Price,
    /// `price - previous price`, never zero.
    pub change: f64,
    /// Local wall-clock time, `HH:MM:SS`.
    pub display_time: String,
}

impl PriceChangeRecord {
    pub fn new(time_ms: i64, price: Price, change: f64) -> Self {
        Self {
            time_ms,
            price,
            change,
            display_time: format_display_time(time_ms),
        }
    }
}

fn format_display_time(time_ms: i64) -> String {
    Local
        .timestamp_millis_opt(time_ms)
        .single()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Aggregate move statistics over the analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChangeStats {
    /// Sum of all changes.
    pub total_change: f64,
    /// Largest upward move, never below zero.
    pub max_up: f64,
    /// Largest downward move, never above zero.
    pub max_down: f64,
}

/// Market pressure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    #[default]
    Neutral,
    Up,
    StrongUp,
    Down,
    StrongDown,
}

impl SignalKind {
    /// Classify a combined score. Thresholds are strict, so 20 and 50
    /// fall into the weaker bucket.
    pub fn from_score(score: f64) -> Self {
        if score > 50.0 {
            Self::StrongUp
        } else if score > 20.0 {
            Self::Up
        } else if score < -50.0 {
            Self::StrongDown
        } else if score < -20.0 {
            Self::Down
        } else {
            Self::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "NEUTRAL",
            Self::Up => "UP",
            Self::StrongUp => "STRONG_UP",
            Self::Down => "DOWN",
            Self::StrongDown => "STRONG_DOWN",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified signal with the score that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Signal {
    #[serde(rename = "type")]
    pub kind: SignalKind,
    pub score: f64,
}

impl Signal {
    pub fn from_score(score: f64) -> Self {
        Self {
            kind: SignalKind::from_score(score),
            score,
        }
    }
}

/// Output of one analysis pass. Replaced wholesale on every pass.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MomentumSnapshot {
    /// Time-weighted net movement, in [-100, 100].
    pub momentum_score: f64,
    /// Signed length of the trailing same-direction run.
    pub trend_strength: i32,
    /// Second-half mean change minus first-half mean change, x100.
    pub acceleration: f64,
    pub stats: ChangeStats,
    pub signal: Signal,
}

/// Everything a renderer needs, published as one immutable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub symbol: String,
    pub connection: ConnectionState,
    pub current_price: Option<Price>,
    /// Price now minus price roughly one second ago.
    pub price_change_1s: f64,
    /// Most recent change records, oldest first.
    pub recent_changes: Vec<PriceChangeRecord>,
    pub momentum: MomentumSnapshot,
    /// Publication time (unix ms).
    pub updated_at_ms: i64,
}

impl FeedSnapshot {
    /// Blank snapshot for a freshly selected symbol.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            connection: ConnectionState::Disconnected,
            current_price: None,
            price_change_1s: 0.0,
            recent_changes: Vec::new(),
            momentum: MomentumSnapshot::default(),
            updated_at_ms: 0,
        }
    }
}
