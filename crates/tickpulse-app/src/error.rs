//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tickpulse_ws::WsError),

    #[error("Analyzer configuration error: {0}")]
    Analyzer(#[from] tickpulse_analyzer::AnalyzerError),

    #[error("Feed error: {0}")]
    Feed(#[from] tickpulse_feed::FeedError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] tickpulse_telemetry::TelemetryError),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Application is shut down")]
    Shutdown,
}

pub type AppResult<T> = Result<T, AppError>;
