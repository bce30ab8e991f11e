//! Error types for tickpulse-analyzer.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalyzerError {
    #[error("{field} must be positive")]
    NonPositive { field: &'static str },

    #[error("trend_window ({trend_window}) must not exceed window_size ({window_size})")]
    TrendWindowTooWide {
        trend_window: usize,
        window_size: usize,
    },

    #[error("acceleration_min_records ({0}) must be at least 2")]
    AccelerationWindowTooSmall(usize),
}

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;
