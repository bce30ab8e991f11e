//! Line-oriented console front end.
//!
//! Maps stdin lines onto `AppHandle` commands and logs every published
//! snapshot. Presentation stays outside the core: this module only reads
//! snapshots from the watch channel.

use crate::app::{AppHandle, Command};
use crate::error::{AppError, AppResult};
use std::io::BufRead;
use std::sync::Arc;
use tickpulse_core::FeedSnapshot;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const HELP: &str = "commands: symbol <SYM> | interval <MS> | pause | resume | quit";

/// Parse one console line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> AppResult<Option<Command>> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let arg = parts.next();
    if parts.next().is_some() {
        return Err(AppError::InvalidCommand(format!("too many arguments: {line}")));
    }

    let command = match (verb.to_ascii_lowercase().as_str(), arg) {
        ("symbol", Some(symbol)) => Command::SwitchSymbol(symbol.to_ascii_uppercase()),
        ("interval", Some(ms)) => {
            let ms: u64 = ms
                .parse()
                .map_err(|_| AppError::InvalidCommand(format!("not a number: {ms}")))?;
            if ms == 0 {
                return Err(AppError::InvalidCommand("interval must be positive".to_string()));
            }
            Command::SetInterval(ms)
        }
        ("pause", None) => Command::StopAnalysis,
        ("resume", None) => Command::StartAnalysis,
        ("quit" | "exit", None) => Command::Shutdown,
        _ => return Err(AppError::InvalidCommand(line.trim().to_string())),
    };
    Ok(Some(command))
}

/// Forward stdin commands until `quit`, EOF, or cancellation.
///
/// Lines are read on a detached thread; a blocking read would otherwise
/// hold up runtime shutdown.
pub async fn read_commands(handle: AppHandle, cancel: CancellationToken) -> AppResult<()> {
    let mut lines = spawn_stdin_reader();
    info!("{HELP}");

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            debug!("stdin closed");
            return Ok(());
        };

        match parse_line(&line) {
            Ok(Some(command)) => {
                let quit = command == Command::Shutdown;
                handle.send(command).await?;
                if quit {
                    return Ok(());
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "{HELP}"),
        }
    }
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Log each snapshot as it is published.
pub async fn render_snapshots(
    mut snapshots: watch::Receiver<Arc<FeedSnapshot>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
        let snapshot = snapshots.borrow_and_update().clone();
        log_snapshot(&snapshot);
    }
}

pub fn log_snapshot(snapshot: &FeedSnapshot) {
    let momentum = &snapshot.momentum;
    info!(
        symbol = %snapshot.symbol,
        connection = %snapshot.connection,
        price = %format_price(snapshot),
        change_1s = snapshot.price_change_1s,
        momentum = momentum.momentum_score,
        trend = momentum.trend_strength,
        acceleration = momentum.acceleration,
        total_change = momentum.stats.total_change,
        max_up = momentum.stats.max_up,
        max_down = momentum.stats.max_down,
        signal = %momentum.signal.kind,
        score = momentum.signal.score,
        records = snapshot.recent_changes.len(),
        "Snapshot"
    );
}

fn format_price(snapshot: &FeedSnapshot) -> String {
    snapshot
        .current_price
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".to_string())
}
