//! Validated price type.
//!
//! Venues publish prices as strings or numbers and occasionally send
//! zero, negative or non-numeric placeholders. `Price` can only hold a
//! finite, strictly positive value, so downstream code never re-checks.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Finite, strictly positive price.
///
/// Serializes as a bare number. Deserializing goes through `TryFrom<f64>`,
/// so the same checks apply to prices read back from storage.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Price(f64);

impl Price {
    /// Create a price, rejecting non-finite and non-positive values.
    #[inline]
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && value > 0.0).then_some(Self(value))
    }

    #[inline]
    pub fn inner(&self) -> f64 {
        self.0
    }

    /// Signed difference `self - other`.
    #[inline]
    pub fn delta(&self, other: Price) -> f64 {
        self.0 - other.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s.trim().parse()?;
        Self::new(value).ok_or_else(|| CoreError::InvalidPrice(s.to_string()))
    }
}

impl TryFrom<f64> for Price {
    type Error = CoreError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| CoreError::InvalidPrice(value.to_string()))
    }
}

impl From<Price> for f64 {
    fn from(price: Price) -> Self {
        price.0
    }
}
