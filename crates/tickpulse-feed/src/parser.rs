//! Price extraction from venue payloads.
//!
//! Venues are inconsistent about which field carries the price and
//! whether it is a string or a number, so each channel has an ordered
//! list of candidate fields. The first candidate holding a finite,
//! strictly positive number wins. Anything else yields no price; the
//! caller never sees an error.

use crate::error::{FeedError, FeedResult};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tickpulse_core::{Price, PriceTick};
use tickpulse_ws::ChannelPayload;
use tracing::trace;

/// Candidate price fields for ticker snapshots, in priority order.
pub const TICKER_PRICE_FIELDS: &[&str] = &["last", "lastPr", "close", "price", "px"];

/// Candidate price fields for trade prints, in priority order.
pub const TRADE_PRICE_FIELDS: &[&str] = &["px", "price", "p"];

/// Accept/reject counters.
#[derive(Debug, Default)]
pub struct NormalizerStats {
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl NormalizerStats {
    fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

/// Extracts prices from ticker and trade payloads.
#[derive(Debug, Default)]
pub struct TickNormalizer {
    stats: NormalizerStats,
}

impl TickNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &NormalizerStats {
        &self.stats
    }

    /// Price from a single ticker object.
    pub fn from_ticker_payload(&self, payload: &Value) -> Option<Price> {
        self.accept(extract_price(payload, TICKER_PRICE_FIELDS))
    }

    /// Prices from a list of trades, in list order. Invalid trades are
    /// skipped individually.
    pub fn from_trade_payload(&self, payloads: &[Value]) -> Vec<Price> {
        payloads
            .iter()
            .filter_map(|trade| self.accept(extract_price(trade, TRADE_PRICE_FIELDS)))
            .collect()
    }

    /// Ticks for one channel payload, all stamped with `arrival_ms`.
    pub fn normalize(&self, payload: &ChannelPayload, arrival_ms: i64) -> Vec<PriceTick> {
        let prices = match payload {
            ChannelPayload::Ticker { payload, .. } => {
                self.from_ticker_payload(payload).into_iter().collect()
            }
            ChannelPayload::Trades { payloads, .. } => self.from_trade_payload(payloads),
        };
        prices
            .into_iter()
            .map(|price| PriceTick::new(price, arrival_ms))
            .collect()
    }

    fn accept(&self, result: FeedResult<Price>) -> Option<Price> {
        match result {
            Ok(price) => {
                self.stats.record_accepted();
                Some(price)
            }
            Err(e) => {
                self.stats.record_rejected();
                trace!(error = %e, "Dropping tick without usable price");
                None
            }
        }
    }
}

/// First usable price among `fields`, in order.
fn extract_price(payload: &Value, fields: &'static [&'static str]) -> FeedResult<Price> {
    let obj = payload
        .as_object()
        .ok_or_else(|| FeedError::InvalidData("payload is not an object".to_string()))?;

    fields
        .iter()
        .filter_map(|field| obj.get(*field))
        .find_map(|value| parse_price(value).ok())
        .ok_or(FeedError::MissingPrice(fields))
}

fn parse_price(value: &Value) -> FeedResult<Price> {
    match value {
        Value::String(s) => Ok(s.parse()?),
        Value::Number(n) => {
            let raw = n
                .as_f64()
                .ok_or_else(|| FeedError::InvalidData(format!("unrepresentable number {n}")))?;
            Ok(Price::try_from(raw)?)
        }
        other => Err(FeedError::InvalidData(format!("unexpected price value {other}"))),
    }
}
