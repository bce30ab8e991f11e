//! Tickpulse - Single-instrument momentum tracker - Entry Point

use anyhow::Result;
use clap::Parser;
use tickpulse_app::{console, AppConfig, Application};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Live momentum tracker for one instrument
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via TICKPULSE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Instrument to track (overrides config)
    #[arg(short, long)]
    symbol: Option<String>,

    /// Analysis interval in milliseconds (overrides config)
    #[arg(long)]
    interval_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any wss:// connection
    tickpulse_ws::init_crypto();

    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(symbol) = args.symbol {
        config.symbol = symbol;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.analysis.interval_ms = interval_ms;
    }
    config.validate()?;

    tickpulse_telemetry::init_logging(&config.telemetry.log_level)?;
    info!("Starting tickpulse v{}", env!("CARGO_PKG_VERSION"));
    info!(symbol = %config.symbol, url = %config.ws_url, "Configuration loaded");

    let app = Application::new(config)?;
    let handle = app.handle();
    let mut app_task = tokio::spawn(app.run());

    let cancel = CancellationToken::new();
    let renderer = tokio::spawn(console::render_snapshots(handle.snapshots(), cancel.clone()));
    let input = tokio::spawn({
        let handle = handle.clone();
        let cancel = cancel.clone();
        async move {
            if let Err(e) = console::read_commands(handle, cancel).await {
                warn!(error = %e, "Console input stopped");
            }
        }
    });

    let result = tokio::select! {
        result = &mut app_task => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
            if let Err(e) = handle.shutdown().await {
                warn!(error = %e, "Application already stopped");
            }
            app_task.await
        }
    };

    cancel.cancel();
    let _ = renderer.await;
    let _ = input.await;

    console::log_snapshot(&handle.current());
    match result {
        Ok(Ok(())) => {
            info!("Shutdown complete");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(error = %e, "Application failed");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
