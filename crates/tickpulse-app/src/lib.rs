//! Single-instrument momentum tracker.
//!
//! Orchestrates the components:
//! - Feed client connection to the venue
//! - Tick normalization and rolling history
//! - Momentum analysis on a fixed cadence
//! - Snapshot publication to renderers

pub mod app;
pub mod config;
pub mod console;
pub mod error;
pub mod scheduler;

pub use app::{AppHandle, Application, Command};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use scheduler::Scheduler;
