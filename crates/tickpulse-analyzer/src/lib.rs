//! Momentum analysis over recent price moves.
//!
//! `MomentumAnalyzer::evaluate` is a pure function of the newest change
//! records (and the previous result, for the one figure that may carry
//! over). It produces:
//! - momentum: time-weighted net movement, clamped to [-100, 100]
//! - trend strength: signed length of the trailing same-direction run
//! - acceleration: second-half mean move minus first-half mean move
//! - aggregate stats and a classified signal

pub mod analyzer;
pub mod config;
pub mod error;

pub use analyzer::{
    acceleration, change_stats, momentum_score, signal_score, trend_strength, MomentumAnalyzer,
};
pub use config::AnalyzerConfig;
pub use error::{AnalyzerError, AnalyzerResult};
