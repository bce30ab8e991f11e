//! Owned per-instrument state.
//!
//! Everything that belongs to the tracked instrument lives here: the
//! history, the derived figures and the symbol itself. It has a single
//! owner (the application event loop), so nothing in it is locked.

use crate::error::{FeedError, FeedResult};
use crate::history::{HistoryBuffer, HistoryConfig, RecordOutcome};
use crate::parser::TickNormalizer;
use tickpulse_core::{ConnectionState, FeedSnapshot, MomentumSnapshot};
use tickpulse_ws::ChannelPayload;
use tracing::debug;

/// Result of applying one channel payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Ticks with a usable price.
    pub accepted: usize,
    /// Ticks dropped for lack of a usable price.
    pub rejected: usize,
    /// Change records appended.
    pub appended: usize,
}

/// State of the tracked instrument.
#[derive(Debug)]
pub struct InstrumentState {
    symbol: String,
    normalizer: TickNormalizer,
    history: HistoryBuffer,
    momentum: MomentumSnapshot,
    price_change_1s: f64,
}

impl InstrumentState {
    pub fn new(symbol: impl Into<String>, config: HistoryConfig) -> Self {
        Self {
            symbol: symbol.into(),
            normalizer: TickNormalizer::new(),
            history: HistoryBuffer::new(config),
            momentum: MomentumSnapshot::default(),
            price_change_1s: 0.0,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn normalizer(&self) -> &TickNormalizer {
        &self.normalizer
    }

    pub fn momentum(&self) -> &MomentumSnapshot {
        &self.momentum
    }

    pub fn price_change_1s(&self) -> f64 {
        self.price_change_1s
    }

    /// Normalize a payload and record every tick in list order.
    ///
    /// Payloads tagged with another instrument are refused.
    pub fn apply(&mut self, payload: &ChannelPayload, now_ms: i64) -> FeedResult<ApplyOutcome> {
        let inst_id = match payload {
            ChannelPayload::Ticker { inst_id, .. } | ChannelPayload::Trades { inst_id, .. } => {
                inst_id.as_deref()
            }
        };
        if let Some(actual) = inst_id {
            if !actual.eq_ignore_ascii_case(&self.symbol) {
                return Err(FeedError::SymbolMismatch {
                    expected: self.symbol.clone(),
                    actual: actual.to_string(),
                });
            }
        }

        let rejected_before = self.normalizer.stats().rejected();
        let ticks = self.normalizer.normalize(payload, now_ms);
        let mut outcome = ApplyOutcome {
            accepted: ticks.len(),
            rejected: (self.normalizer.stats().rejected() - rejected_before) as usize,
            appended: 0,
        };
        for tick in ticks {
            if let RecordOutcome::Appended(record) = self.history.record(tick.price, tick.arrival_ms) {
                debug!(price = %record.price, change = record.change, "Price change recorded");
                outcome.appended += 1;
            }
        }
        Ok(outcome)
    }

    /// Evict expired records before a read.
    pub fn prune(&mut self, now_ms: i64) -> usize {
        self.history.prune(now_ms)
    }

    /// Refresh the one-second delta, keeping the previous value when no
    /// reference is available.
    pub fn refresh_price_change(
        &mut self,
        now_ms: i64,
        lookback_ms: i64,
        max_staleness_ms: i64,
        noise_threshold: f64,
    ) -> f64 {
        if let Some(change) =
            self.history
                .price_change_since(now_ms, lookback_ms, max_staleness_ms, noise_threshold)
        {
            self.price_change_1s = change;
        }
        self.price_change_1s
    }

    /// Replace the momentum figures wholesale.
    pub fn set_momentum(&mut self, momentum: MomentumSnapshot) {
        self.momentum = momentum;
    }

    /// Immutable view for renderers.
    pub fn snapshot(
        &self,
        connection: ConnectionState,
        recent_changes: usize,
        now_ms: i64,
    ) -> FeedSnapshot {
        FeedSnapshot {
            symbol: self.symbol.clone(),
            connection,
            current_price: self.history.last_price(),
            price_change_1s: self.price_change_1s,
            recent_changes: self.history.window(recent_changes),
            momentum: self.momentum,
            updated_at_ms: now_ms,
        }
    }

    /// Start over for another instrument.
    pub fn reset(&mut self, symbol: impl Into<String>) {
        self.symbol = symbol.into();
        self.history.clear();
        self.momentum = MomentumSnapshot::default();
        self.price_change_1s = 0.0;
        self.normalizer = TickNormalizer::new();
    }
}
