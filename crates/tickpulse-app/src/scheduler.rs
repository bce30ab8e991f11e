//! Analysis cadence.
//!
//! Fires on a fixed interval independent of tick arrival. Each firing is
//! additionally throttled against the last accepted run, so coalesced or
//! bunched timer wakeups never run analysis more often than the interval.

use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::debug;

/// Periodic analysis timer.
#[derive(Debug)]
pub struct Scheduler {
    interval: Duration,
    timer: Option<Interval>,
    last_run: Option<Instant>,
}

impl Scheduler {
    /// Create a stopped scheduler.
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval: period(interval_ms),
            timer: None,
            last_run: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start (or restart) firing every `interval_ms`. The first firing is
    /// one full interval from now.
    pub fn start(&mut self, interval_ms: u64) {
        self.interval = period(interval_ms);
        let mut timer = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timer = Some(timer);
        debug!(interval_ms = self.interval.as_millis() as u64, "Scheduler started");
    }

    pub fn stop(&mut self) {
        if self.timer.take().is_some() {
            debug!("Scheduler stopped");
        }
    }

    /// Change the cadence. A running timer restarts with the new period;
    /// a stopped one stays stopped and uses it on the next `start`.
    pub fn set_interval(&mut self, interval_ms: u64) {
        if self.is_running() {
            self.start(interval_ms);
        } else {
            self.interval = period(interval_ms);
        }
    }

    /// Wait for the next firing and return its scheduled instant. Never
    /// completes while stopped.
    pub async fn tick(&mut self) -> Instant {
        match self.timer.as_mut() {
            Some(timer) => timer.tick().await,
            None => std::future::pending().await,
        }
    }

    /// Throttle: true if at least one interval has passed since the last
    /// accepted run, recording `now` as the new last run. Pass the instant
    /// returned by `tick` so handler latency does not shorten the gap.
    pub fn should_run(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_run {
            if now.saturating_duration_since(last) < self.interval {
                return false;
            }
        }
        self.last_run = Some(now);
        true
    }
}

fn period(interval_ms: u64) -> Duration {
    Duration::from_millis(interval_ms.max(1))
}
