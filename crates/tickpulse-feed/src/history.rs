//! Rolling price-change history.
//!
//! Stores a `PriceChangeRecord` for every tick that moved the price and
//! evicts records by age only. Records are kept in arrival order, which
//! is also time order.

use std::collections::VecDeque;
use tickpulse_core::{Price, PriceChangeRecord};
use tracing::trace;

/// History buffer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Records older than this are evicted.
    pub retention_ms: i64,
    /// How many of the newest records `nearest_to` inspects.
    pub nearest_scan_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention_ms: 30_000,
            nearest_scan_depth: 50,
        }
    }
}

/// What `record` did with a price.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// First price seen; it becomes the reference and nothing is stored.
    Initial,
    /// Same as the last price; the reference advances, nothing is stored.
    Unchanged,
    /// The price moved and a record was appended.
    Appended(PriceChangeRecord),
}

/// Time-bounded store of price moves.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    config: HistoryConfig,
    records: VecDeque<PriceChangeRecord>,
    last_price: Option<Price>,
}

impl HistoryBuffer {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            records: VecDeque::new(),
            last_price: None,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Most recently accepted price.
    pub fn last_price(&self) -> Option<Price> {
        self.last_price
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Feed one accepted price observed at `now_ms`.
    ///
    /// The reference price always advances, even when the move is zero.
    pub fn record(&mut self, price: Price, now_ms: i64) -> RecordOutcome {
        let Some(previous) = self.last_price.replace(price) else {
            trace!(%price, "Reference price established");
            return RecordOutcome::Initial;
        };

        let change = price.delta(previous);
        if change == 0.0 {
            return RecordOutcome::Unchanged;
        }

        let record = PriceChangeRecord::new(now_ms, price, change);
        self.records.push_back(record.clone());
        self.prune(now_ms);
        RecordOutcome::Appended(record)
    }

    /// Drop every record not newer than `now_ms - retention_ms`.
    pub fn prune(&mut self, now_ms: i64) -> usize {
        let cutoff = now_ms - self.config.retention_ms;
        let before = self.records.len();
        while self.records.front().is_some_and(|r| r.time_ms <= cutoff) {
            self.records.pop_front();
        }
        let removed = before - self.records.len();
        if removed > 0 {
            trace!(removed, remaining = self.records.len(), "Pruned history");
        }
        removed
    }

    /// The newest `n` records, oldest first.
    pub fn window(&self, n: usize) -> Vec<PriceChangeRecord> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip).cloned().collect()
    }

    /// The record closest in time to `target_ms` among the newest
    /// `nearest_scan_depth` records, if it lies within `max_staleness_ms`.
    /// On a tie the newer record wins.
    pub fn nearest_to(&self, target_ms: i64, max_staleness_ms: i64) -> Option<&PriceChangeRecord> {
        self.records
            .iter()
            .rev()
            .take(self.config.nearest_scan_depth)
            .map(|r| ((r.time_ms - target_ms).abs(), r))
            .filter(|(distance, _)| *distance <= max_staleness_ms)
            .fold(None, |best: Option<(i64, &PriceChangeRecord)>, candidate| match best {
                Some(b) if b.0 <= candidate.0 => Some(b),
                _ => Some(candidate),
            })
            .map(|(_, r)| r)
    }

    /// Move over roughly the last `lookback_ms`.
    ///
    /// Uses the record nearest to `now_ms - lookback_ms`. Without one,
    /// falls back to the newest record's own change when it exceeds
    /// `noise_threshold`. `None` means keep the previous figure.
    pub fn price_change_since(
        &self,
        now_ms: i64,
        lookback_ms: i64,
        max_staleness_ms: i64,
        noise_threshold: f64,
    ) -> Option<f64> {
        let last = self.last_price?;
        if let Some(then) = self.nearest_to(now_ms - lookback_ms, max_staleness_ms) {
            return Some(last.delta(then.price));
        }

        let mut newest = self.records.iter().rev();
        match (newest.next(), newest.next()) {
            (Some(latest), Some(prior)) => {
                let delta = latest.price.delta(prior.price);
                (delta.abs() > noise_threshold).then_some(delta)
            }
            _ => None,
        }
    }

    /// Forget all records and the reference price.
    pub fn clear(&mut self) {
        self.records.clear();
        self.last_price = None;
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}
