//! Main application orchestration.
//!
//! A single task owns all mutable per-instrument state and serializes:
//! - feed events (connection state, ticker and trade payloads)
//! - scheduled analysis passes
//! - control commands from `AppHandle`
//!
//! Renderers read `FeedSnapshot`s from a watch channel and never touch
//! the state directly.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::scheduler::Scheduler;
use std::sync::Arc;
use std::time::Duration;
use tickpulse_analyzer::MomentumAnalyzer;
use tickpulse_core::{ConnectionState, FeedSnapshot};
use tickpulse_feed::InstrumentState;
use tickpulse_telemetry::Metrics;
use tickpulse_ws::{FeedClient, FeedEvent};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How long a feed client gets to close cleanly before it is aborted.
const FEED_TEARDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Capacity of the command channel.
const COMMAND_BUFFER: usize = 32;

/// Control commands for the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Tear down and track another instrument.
    SwitchSymbol(String),
    /// Change the analysis cadence.
    SetInterval(u64),
    /// Pause scheduled analysis.
    StopAnalysis,
    /// Resume scheduled analysis.
    StartAnalysis,
    /// Stop the event loop.
    Shutdown,
}

/// Cloneable control surface for a running `Application`.
#[derive(Debug, Clone)]
pub struct AppHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Arc<FeedSnapshot>>,
}

impl AppHandle {
    pub async fn switch_symbol(&self, symbol: impl Into<String>) -> AppResult<()> {
        self.send(Command::SwitchSymbol(symbol.into())).await
    }

    pub async fn set_interval(&self, interval_ms: u64) -> AppResult<()> {
        self.send(Command::SetInterval(interval_ms)).await
    }

    pub async fn stop_analysis(&self) -> AppResult<()> {
        self.send(Command::StopAnalysis).await
    }

    pub async fn start_analysis(&self) -> AppResult<()> {
        self.send(Command::StartAnalysis).await
    }

    pub async fn shutdown(&self) -> AppResult<()> {
        self.send(Command::Shutdown).await
    }

    pub async fn send(&self, command: Command) -> AppResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| AppError::Shutdown)
    }

    /// Subscribe to published snapshots.
    pub fn snapshots(&self) -> watch::Receiver<Arc<FeedSnapshot>> {
        self.snapshots.clone()
    }

    /// Latest published snapshot.
    pub fn current(&self) -> Arc<FeedSnapshot> {
        self.snapshots.borrow().clone()
    }
}

/// A running feed client and its private event channel.
struct FeedTask {
    client: Arc<FeedClient>,
    task: JoinHandle<()>,
    events: mpsc::Receiver<FeedEvent>,
    reported_reconnects: u64,
    reported_malformed: u64,
}

impl FeedTask {
    fn spawn(config: &AppConfig, symbol: &str) -> Self {
        let (event_tx, events) = mpsc::channel(config.feed.event_buffer);
        let client = Arc::new(FeedClient::new(config.feed_config(symbol), event_tx));

        let runner = client.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = runner.connect().await {
                error!(?e, symbol = %runner.symbol(), "Feed client failed");
            }
        });

        Self {
            client,
            task,
            events,
            reported_reconnects: 0,
            reported_malformed: 0,
        }
    }

    /// Push counter growth since the last report into metrics.
    fn report_counters(&mut self) {
        let reconnects = self.client.reconnects_scheduled();
        if reconnects > self.reported_reconnects {
            Metrics::feed_reconnects(
                self.client.symbol(),
                reconnects - self.reported_reconnects,
            );
            self.reported_reconnects = reconnects;
        }

        let malformed = self.client.frame_stats().malformed;
        if malformed > self.reported_malformed {
            Metrics::frames_malformed(malformed - self.reported_malformed);
            self.reported_malformed = malformed;
        }
    }

    async fn shutdown(mut self) {
        self.client.disconnect();
        self.report_counters();
        if tokio::time::timeout(FEED_TEARDOWN_TIMEOUT, &mut self.task)
            .await
            .is_err()
        {
            warn!(symbol = %self.client.symbol(), "Feed client did not stop in time, aborting");
            self.task.abort();
        }
    }
}

async fn next_feed_event(feed: &mut Option<FeedTask>) -> Option<FeedEvent> {
    match feed {
        Some(feed) => feed.events.recv().await,
        None => std::future::pending().await,
    }
}

/// Main application.
pub struct Application {
    config: AppConfig,
    analyzer: MomentumAnalyzer,
    state: InstrumentState,
    scheduler: Scheduler,
    connection: ConnectionState,
    feed: Option<FeedTask>,
    commands_tx: mpsc::Sender<Command>,
    commands_rx: mpsc::Receiver<Command>,
    snapshot_tx: watch::Sender<Arc<FeedSnapshot>>,
}

impl Application {
    /// Create a new application. Nothing is spawned until `run`.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let symbol = normalize_symbol(&config.symbol);
        let state = InstrumentState::new(symbol.clone(), config.history_config());
        let analyzer = MomentumAnalyzer::new(config.analyzer_config());
        let scheduler = Scheduler::new(config.analysis.interval_ms);
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, _) = watch::channel(Arc::new(FeedSnapshot::empty(symbol)));

        Ok(Self {
            config,
            analyzer,
            state,
            scheduler,
            connection: ConnectionState::Disconnected,
            feed: None,
            commands_tx,
            commands_rx,
            snapshot_tx,
        })
    }

    pub fn handle(&self) -> AppHandle {
        AppHandle {
            commands: self.commands_tx.clone(),
            snapshots: self.snapshot_tx.subscribe(),
        }
    }

    /// Run until a `Shutdown` command.
    pub async fn run(mut self) -> AppResult<()> {
        info!(
            symbol = %self.state.symbol(),
            url = %self.config.ws_url,
            interval_ms = self.config.analysis.interval_ms,
            "Starting application"
        );

        self.feed = Some(FeedTask::spawn(&self.config, self.state.symbol()));
        self.scheduler.start(self.config.analysis.interval_ms);
        Metrics::feed_state_set(self.connection.as_str());
        self.publish();

        info!("Entering main event loop");
        loop {
            tokio::select! {
                Some(event) = next_feed_event(&mut self.feed) => {
                    self.handle_feed_event(event);
                }

                at = self.scheduler.tick() => {
                    if self.scheduler.should_run(at) {
                        self.run_analysis();
                    }
                }

                command = self.commands_rx.recv() => {
                    match command {
                        Some(Command::Shutdown) | None => {
                            info!("Shutdown requested");
                            break;
                        }
                        Some(command) => self.handle_command(command).await,
                    }
                }
            }
        }

        self.scheduler.stop();
        if let Some(feed) = self.feed.take() {
            feed.shutdown().await;
        }
        self.connection = ConnectionState::Disconnected;
        Metrics::feed_state_set(self.connection.as_str());
        self.publish();
        info!(symbol = %self.state.symbol(), "Application stopped");
        Ok(())
    }

    fn handle_feed_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::State(state) => {
                if state != self.connection {
                    info!(symbol = %self.state.symbol(), from = %self.connection, to = %state, "Feed state changed");
                    self.connection = state;
                    Metrics::feed_state_set(state.as_str());
                    self.publish();
                }
            }
            FeedEvent::Payload(payload) => {
                Metrics::frame_received(payload.channel().as_str());
                match self.state.apply(&payload, now_ms()) {
                    Ok(outcome) => {
                        Metrics::ticks(outcome.accepted as u64, outcome.rejected as u64);
                        Metrics::change_records(outcome.appended as u64);
                    }
                    Err(e) => debug!(error = %e, "Payload ignored"),
                }
            }
        }
    }

    /// One scheduled pass: prune, refresh derived figures, analyze when
    /// enough history exists, publish.
    fn run_analysis(&mut self) {
        let now = now_ms();
        let analysis = &self.config.analysis;

        self.state.prune(now);
        self.state.refresh_price_change(
            now,
            analysis.lookback_ms,
            analysis.lookback_max_staleness_ms,
            analysis.noise_threshold,
        );

        if self.state.history().len() >= self.analyzer.config().min_records {
            let window = self.state.history().window(self.analyzer.config().window_size);
            let momentum = self.analyzer.evaluate(&window, self.state.momentum());
            Metrics::analysis_run(
                momentum.momentum_score,
                momentum.signal.score,
                momentum.signal.kind.as_str(),
            );
            self.state.set_momentum(momentum);
        }

        if let Some(feed) = self.feed.as_mut() {
            feed.report_counters();
        }
        self.publish();
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::SwitchSymbol(symbol) => self.switch_symbol(&symbol).await,
            Command::SetInterval(interval_ms) => {
                if interval_ms == 0 {
                    warn!("Ignoring zero analysis interval");
                    return;
                }
                info!(interval_ms, "Analysis interval changed");
                self.config.analysis.interval_ms = interval_ms;
                self.scheduler.set_interval(interval_ms);
            }
            Command::StopAnalysis => {
                info!("Analysis paused");
                self.scheduler.stop();
            }
            Command::StartAnalysis => {
                if !self.scheduler.is_running() {
                    info!("Analysis resumed");
                    self.scheduler.start(self.config.analysis.interval_ms);
                }
            }
            Command::Shutdown => {}
        }
    }

    /// Replace the tracked instrument.
    ///
    /// The old client is fully stopped and its queued events discarded
    /// before the new state is published, so no snapshot mixes data from
    /// both instruments. Asking for the current symbol reconnects it.
    async fn switch_symbol(&mut self, symbol: &str) {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            warn!("Ignoring empty symbol");
            return;
        }

        if symbol == self.state.symbol() {
            if let Some(feed) = &self.feed {
                info!(%symbol, "Reconnect requested for current symbol");
                let client = feed.client.clone();
                tokio::spawn(async move {
                    if let Err(e) = client.connect().await {
                        warn!(?e, "Reconnect request failed");
                    }
                });
            }
            return;
        }

        info!(from = %self.state.symbol(), to = %symbol, "Switching symbol");
        if let Some(feed) = self.feed.take() {
            feed.shutdown().await;
        }

        self.state.reset(symbol.clone());
        self.connection = ConnectionState::Disconnected;
        self.feed = Some(FeedTask::spawn(&self.config, &symbol));
        Metrics::feed_state_set(self.connection.as_str());
        self.publish();
    }

    fn publish(&self) {
        let snapshot = self.state.snapshot(
            self.connection,
            self.config.history.recent_changes,
            now_ms(),
        );
        self.snapshot_tx.send_replace(Arc::new(snapshot));
    }
}

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
