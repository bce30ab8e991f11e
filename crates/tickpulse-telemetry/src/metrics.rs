//! Prometheus metrics for tickpulse.
//!
//! Covers:
//! - Feed connection state and reconnects
//! - Frame and tick flow
//! - Analysis runs and their output
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, which is a startup bug. These panics only
//! occur during static initialization, never at runtime.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_gauge, register_gauge_vec, register_int_counter, register_int_counter_vec, Encoder,
    Gauge, GaugeVec, IntCounter, IntCounterVec, TextEncoder,
};

const FEED_STATES: [&str; 3] = ["disconnected", "connecting", "connected"];

/// Feed connection state (1 = connected, 0 otherwise).
pub static FEED_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "tickpulse_feed_connected",
        "Feed connection state (1=connected)"
    )
    .unwrap()
});

/// Feed state machine current state.
/// Labels: state (disconnected/connecting/connected)
pub static FEED_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "tickpulse_feed_state",
        "Feed state machine current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Reconnects scheduled after a close.
pub static FEED_RECONNECT_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tickpulse_feed_reconnect_total",
        "Total reconnects scheduled by the feed client",
        &["symbol"]
    )
    .unwrap()
});

/// Data frames received, by channel.
pub static FRAMES_RECEIVED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tickpulse_frames_received_total",
        "Total market data frames received",
        &["channel"]
    )
    .unwrap()
});

/// Frames that failed to decode.
pub static FRAMES_MALFORMED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "tickpulse_frames_malformed_total",
        "Total frames dropped as malformed"
    )
    .unwrap()
});

/// Ticks by outcome.
/// Labels: outcome (accepted/rejected)
pub static TICKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tickpulse_ticks_total",
        "Total ticks seen by the normalizer",
        &["outcome"]
    )
    .unwrap()
});

/// Change records appended to history.
pub static CHANGE_RECORDS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "tickpulse_change_records_total",
        "Total price change records appended"
    )
    .unwrap()
});

/// Completed analysis passes.
pub static ANALYSIS_RUNS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "tickpulse_analysis_runs_total",
        "Total momentum analysis passes"
    )
    .unwrap()
});

/// Latest momentum score.
pub static MOMENTUM_SCORE: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("tickpulse_momentum_score", "Latest momentum score").unwrap()
});

/// Latest combined signal score.
pub static SIGNAL_SCORE: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("tickpulse_signal_score", "Latest combined signal score").unwrap()
});

/// Classified signals, by type.
pub static SIGNALS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tickpulse_signals_total",
        "Total classified signals",
        &["signal"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Set feed state. Only the active state is 1.
    pub fn feed_state_set(state: &str) {
        for s in FEED_STATES {
            FEED_STATE.with_label_values(&[s]).set(0.0);
        }
        FEED_STATE.with_label_values(&[state]).set(1.0);
        FEED_CONNECTED.set(if state == "connected" { 1.0 } else { 0.0 });
    }

    /// Record newly scheduled reconnects.
    pub fn feed_reconnects(symbol: &str, count: u64) {
        FEED_RECONNECT_TOTAL
            .with_label_values(&[symbol])
            .inc_by(count);
    }

    pub fn frame_received(channel: &str) {
        FRAMES_RECEIVED_TOTAL.with_label_values(&[channel]).inc();
    }

    /// Record newly dropped malformed frames.
    pub fn frames_malformed(count: u64) {
        FRAMES_MALFORMED_TOTAL.inc_by(count);
    }

    pub fn ticks(accepted: u64, rejected: u64) {
        TICKS_TOTAL.with_label_values(&["accepted"]).inc_by(accepted);
        TICKS_TOTAL.with_label_values(&["rejected"]).inc_by(rejected);
    }

    pub fn change_records(count: u64) {
        CHANGE_RECORDS_TOTAL.inc_by(count);
    }

    /// Record one analysis pass and its output.
    pub fn analysis_run(momentum: f64, signal_score: f64, signal: &str) {
        ANALYSIS_RUNS_TOTAL.inc();
        MOMENTUM_SCORE.set(momentum);
        SIGNAL_SCORE.set(signal_score);
        SIGNALS_TOTAL.with_label_values(&[signal]).inc();
    }

    /// Text exposition of every registered metric.
    pub fn render() -> TelemetryResult<String> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buf)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
