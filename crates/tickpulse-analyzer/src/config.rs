//! Analyzer configuration.

use crate::error::{AnalyzerError, AnalyzerResult};
use serde::{Deserialize, Serialize};

/// Window sizes and thresholds for momentum analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Newest change records considered per pass.
    pub window_size: usize,
    /// Newest records inspected for the trend run.
    pub trend_window: usize,
    /// Buffered records required before analysis runs at all.
    pub min_records: usize,
    /// Records required before acceleration is recomputed.
    pub acceleration_min_records: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            trend_window: 10,
            min_records: 3,
            acceleration_min_records: 5,
        }
    }
}

impl AnalyzerConfig {
    /// Validate configuration values.
    ///
    /// Returns Err if any window is zero or the trend window is wider
    /// than the analysis window.
    pub fn validate(&self) -> AnalyzerResult<()> {
        if self.window_size == 0 {
            return Err(AnalyzerError::NonPositive { field: "window_size" });
        }
        if self.trend_window == 0 {
            return Err(AnalyzerError::NonPositive { field: "trend_window" });
        }
        if self.trend_window > self.window_size {
            return Err(AnalyzerError::TrendWindowTooWide {
                trend_window: self.trend_window,
                window_size: self.window_size,
            });
        }
        // Each half needs at least one record
        if self.acceleration_min_records < 2 {
            return Err(AnalyzerError::AccelerationWindowTooSmall(
                self.acceleration_min_records,
            ));
        }
        Ok(())
    }
}
