//! Core domain types for the tickpulse momentum tracker.
//!
//! This crate provides the types shared by every other crate:
//! - `Price`: finite, strictly positive price
//! - `PriceTick`, `PriceChangeRecord`: raw observations and stored moves
//! - `MomentumSnapshot`, `Signal`: analyzer output
//! - `FeedSnapshot`: the immutable view handed to renderers
//! - `ConnectionState`: feed transport lifecycle

pub mod error;
pub mod price;
pub mod types;

pub use error::{CoreError, Result};
pub use price::Price;
pub use types::{
    ChangeStats, ConnectionState, FeedSnapshot, MomentumSnapshot, PriceChangeRecord, PriceTick,
    Signal, SignalKind,
};
