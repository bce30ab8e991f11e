//! Tick normalization and rolling history for one instrument.
//!
//! Turns channel payloads from the feed client into validated prices,
//! stores price moves in a time-bounded buffer, and keeps everything
//! for the tracked instrument in one owned `InstrumentState`.

pub mod error;
pub mod history;
pub mod parser;
pub mod state;

pub use error::{FeedError, FeedResult};
pub use history::{HistoryBuffer, HistoryConfig, RecordOutcome};
pub use parser::{NormalizerStats, TickNormalizer, TICKER_PRICE_FIELDS, TRADE_PRICE_FIELDS};
pub use state::{ApplyOutcome, InstrumentState};
