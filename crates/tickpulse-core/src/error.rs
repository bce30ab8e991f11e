//! Error types for tickpulse-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Float parse error: {0}")]
    FloatParse(#[from] std::num::ParseFloatError),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
