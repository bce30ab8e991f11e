//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("No usable price in fields {0:?}")]
    MissingPrice(&'static [&'static str]),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Payload for {actual} while tracking {expected}")]
    SymbolMismatch { expected: String, actual: String },

    #[error(transparent)]
    Core(#[from] tickpulse_core::CoreError),
}

pub type FeedResult<T> = Result<T, FeedError>;
