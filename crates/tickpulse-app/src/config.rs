//! Application configuration.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tickpulse_analyzer::AnalyzerConfig;
use tickpulse_feed::HistoryConfig;
use tickpulse_ws::FeedConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TICKPULSE_CONFIG";
/// Config file used when neither the CLI nor the environment names one.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Feed transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSection {
    /// Fixed delay before each reconnect (ms). Default: 5,000.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Keep-alive interval (ms). Default: 30,000.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Capacity of the feed event channel. Default: 1,024.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_reconnect_delay_ms() -> u64 {
    5_000
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_event_buffer() -> usize {
    1_024
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// History buffer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySection {
    /// Age after which change records are evicted (ms). Default: 30,000.
    #[serde(default = "default_retention_ms")]
    pub retention_ms: i64,
    /// Change records included in each snapshot. Default: 15.
    #[serde(default = "default_recent_changes")]
    pub recent_changes: usize,
    /// Newest records scanned for the one-second lookback. Default: 50.
    #[serde(default = "default_nearest_scan_depth")]
    pub nearest_scan_depth: usize,
}

fn default_retention_ms() -> i64 {
    30_000
}

fn default_recent_changes() -> usize {
    15
}

fn default_nearest_scan_depth() -> usize {
    50
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            retention_ms: default_retention_ms(),
            recent_changes: default_recent_changes(),
            nearest_scan_depth: default_nearest_scan_depth(),
        }
    }
}

/// Analysis cadence and window configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSection {
    /// Analysis cadence (ms). Default: 1,000.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Change records per analysis pass. Default: 20.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Records inspected for the trend run. Default: 10.
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,
    /// Records required before analysis runs. Default: 3.
    #[serde(default = "default_min_records")]
    pub min_records: usize,
    /// Records required before acceleration is recomputed. Default: 5.
    #[serde(default = "default_acceleration_min_records")]
    pub acceleration_min_records: usize,
    /// Lookback for the short-horizon price delta (ms). Default: 1,000.
    #[serde(default = "default_lookback_ms")]
    pub lookback_ms: i64,
    /// Furthest a lookback record may be from its target (ms). Default: 2,000.
    #[serde(default = "default_lookback_max_staleness_ms")]
    pub lookback_max_staleness_ms: i64,
    /// Moves at or below this are ignored by the lookback fallback. Default: 0.01.
    #[serde(default = "default_noise_threshold")]
    pub noise_threshold: f64,
}

fn default_interval_ms() -> u64 {
    1_000
}

fn default_window_size() -> usize {
    20
}

fn default_trend_window() -> usize {
    10
}

fn default_min_records() -> usize {
    3
}

fn default_acceleration_min_records() -> usize {
    5
}

fn default_lookback_ms() -> i64 {
    1_000
}

fn default_lookback_max_staleness_ms() -> i64 {
    2_000
}

fn default_noise_threshold() -> f64 {
    0.01
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            window_size: default_window_size(),
            trend_window: default_trend_window(),
            min_records: default_min_records(),
            acceleration_min_records: default_acceleration_min_records(),
            lookback_ms: default_lookback_ms(),
            lookback_max_staleness_ms: default_lookback_max_staleness_ms(),
            noise_threshold: default_noise_threshold(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Venue WebSocket endpoint.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Instrument tracked at startup.
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Instrument class sent with subscriptions.
    #[serde(default = "default_inst_type")]
    pub inst_type: String,
    #[serde(default)]
    pub feed: FeedSection,
    #[serde(default)]
    pub history: HistorySection,
    #[serde(default)]
    pub analysis: AnalysisSection,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_ws_url() -> String {
    "wss://ws.bitget.com/mix/v1/stream".to_string()
}

fn default_symbol() -> String {
    "ETHUSDT".to_string()
}

fn default_inst_type() -> String {
    "mc".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            symbol: default_symbol(),
            inst_type: default_inst_type(),
            feed: FeedSection::default(),
            history: HistorySection::default(),
            analysis: AnalysisSection::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Path precedence: `path` argument > `TICKPULSE_CONFIG` > default path.
    /// A missing file falls back to defaults.
    pub fn load(path: Option<&str>) -> AppResult<Self> {
        let config_path = path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Validate configuration values.
    pub fn validate(&self) -> AppResult<()> {
        if self.symbol.trim().is_empty() {
            return Err(AppError::Config("symbol must not be empty".to_string()));
        }
        if self.ws_url.is_empty() {
            return Err(AppError::Config("ws_url must not be empty".to_string()));
        }
        if self.feed.reconnect_delay_ms == 0 {
            return Err(AppError::Config("feed.reconnect_delay_ms must be positive".to_string()));
        }
        if self.feed.heartbeat_interval_ms == 0 {
            return Err(AppError::Config(
                "feed.heartbeat_interval_ms must be positive".to_string(),
            ));
        }
        if self.feed.event_buffer == 0 {
            return Err(AppError::Config("feed.event_buffer must be positive".to_string()));
        }
        if self.history.retention_ms <= 0 {
            return Err(AppError::Config("history.retention_ms must be positive".to_string()));
        }
        if self.history.recent_changes == 0 || self.history.nearest_scan_depth == 0 {
            return Err(AppError::Config(
                "history.recent_changes and history.nearest_scan_depth must be positive"
                    .to_string(),
            ));
        }
        if self.analysis.interval_ms == 0 {
            return Err(AppError::Config("analysis.interval_ms must be positive".to_string()));
        }
        if self.analysis.lookback_ms <= 0 || self.analysis.lookback_max_staleness_ms < 0 {
            return Err(AppError::Config(
                "analysis lookback settings must be positive".to_string(),
            ));
        }
        if self.analysis.noise_threshold.is_nan() || self.analysis.noise_threshold < 0.0 {
            return Err(AppError::Config(
                "analysis.noise_threshold must be non-negative".to_string(),
            ));
        }
        self.analyzer_config().validate()?;
        Ok(())
    }

    /// Feed client settings for `symbol`.
    pub fn feed_config(&self, symbol: &str) -> FeedConfig {
        FeedConfig {
            url: self.ws_url.clone(),
            symbol: symbol.to_string(),
            inst_type: self.inst_type.clone(),
            reconnect_delay_ms: self.feed.reconnect_delay_ms,
            heartbeat_interval_ms: self.feed.heartbeat_interval_ms,
        }
    }

    pub fn history_config(&self) -> HistoryConfig {
        HistoryConfig {
            retention_ms: self.history.retention_ms,
            nearest_scan_depth: self.history.nearest_scan_depth,
        }
    }

    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            window_size: self.analysis.window_size,
            trend_window: self.analysis.trend_window,
            min_records: self.analysis.min_records,
            acceleration_min_records: self.analysis.acceleration_min_records,
        }
    }
}
