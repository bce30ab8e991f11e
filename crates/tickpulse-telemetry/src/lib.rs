//! Prometheus metrics and structured logging for tickpulse.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus metrics for feed health, tick flow and momentum output

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
