//! Momentum analyzer.

use crate::config::AnalyzerConfig;
use tickpulse_core::{ChangeStats, MomentumSnapshot, PriceChangeRecord, Signal};
use tracing::debug;

/// Scale applied to the weighted change sum.
const MOMENTUM_SCALE: f64 = 100.0;
/// Bound on the momentum score.
const MOMENTUM_LIMIT: f64 = 100.0;
/// Scale applied to the difference of half means.
const ACCELERATION_SCALE: f64 = 100.0;
/// Score contribution per unit of trend strength.
const TREND_WEIGHT: f64 = 10.0;
/// Score contribution per unit of acceleration.
const ACCELERATION_WEIGHT: f64 = 0.5;

/// Computes a `MomentumSnapshot` from the newest change records.
#[derive(Debug, Clone, Default)]
pub struct MomentumAnalyzer {
    config: AnalyzerConfig,
}

impl MomentumAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Evaluate the window (oldest first).
    ///
    /// Only the newest `window_size` records are used. An empty window
    /// returns `previous` unchanged. Acceleration carries over from
    /// `previous` when the window is shorter than
    /// `acceleration_min_records`; every other figure is recomputed.
    pub fn evaluate(
        &self,
        window: &[PriceChangeRecord],
        previous: &MomentumSnapshot,
    ) -> MomentumSnapshot {
        let start = window.len().saturating_sub(self.config.window_size);
        let recent = &window[start..];
        if recent.is_empty() {
            return *previous;
        }

        let changes: Vec<f64> = recent.iter().map(|r| r.change).collect();

        let momentum = momentum_score(&changes);
        let trend_start = changes.len().saturating_sub(self.config.trend_window);
        let trend = trend_strength(&changes[trend_start..]);
        let accel = if changes.len() >= self.config.acceleration_min_records {
            acceleration(&changes)
        } else {
            previous.acceleration
        };
        let stats = change_stats(&changes);
        let signal = Signal::from_score(signal_score(momentum, trend, accel));

        debug!(
            records = changes.len(),
            momentum,
            trend,
            acceleration = accel,
            score = signal.score,
            signal = %signal.kind,
            "Momentum evaluated"
        );

        MomentumSnapshot {
            momentum_score: momentum,
            trend_strength: trend,
            acceleration: accel,
            stats,
            signal,
        }
    }
}

/// Sum of `change_i * (i + 1) / n`, scaled by 100 and clamped.
pub fn momentum_score(changes: &[f64]) -> f64 {
    if changes.is_empty() {
        return 0.0;
    }
    let n = changes.len() as f64;
    let weighted: f64 = changes
        .iter()
        .enumerate()
        .map(|(i, c)| c * (i as f64 + 1.0) / n)
        .sum();
    (weighted * MOMENTUM_SCALE).clamp(-MOMENTUM_LIMIT, MOMENTUM_LIMIT)
}

/// Signed length of the trailing run of same-direction moves.
///
/// Zero changes neither break nor extend a run. Returns 0 when no
/// directional move exists.
pub fn trend_strength(changes: &[f64]) -> i32 {
    let mut run = 0;
    let mut last_direction = 0;
    for &change in changes {
        let direction = direction(change);
        if direction == 0 {
            continue;
        }
        if direction == last_direction {
            run += 1;
        } else {
            run = 1;
        }
        last_direction = direction;
    }
    run * last_direction
}

/// `(mean(second half) - mean(first half)) * 100`. With an odd count the
/// middle element belongs to the second half. Needs at least two changes.
pub fn acceleration(changes: &[f64]) -> f64 {
    let mid = changes.len() / 2;
    let (first, second) = changes.split_at(mid);
    match (mean(first), mean(second)) {
        (Some(a), Some(b)) => (b - a) * ACCELERATION_SCALE,
        _ => 0.0,
    }
}

/// Total change and extremes, with `max_up >= 0` and `max_down <= 0`.
pub fn change_stats(changes: &[f64]) -> ChangeStats {
    ChangeStats {
        total_change: changes.iter().sum(),
        max_up: changes.iter().copied().fold(0.0, f64::max),
        max_down: changes.iter().copied().fold(0.0, f64::min),
    }
}

/// `momentum + trend * 10 + acceleration * 0.5`.
pub fn signal_score(momentum: f64, trend: i32, acceleration: f64) -> f64 {
    momentum + f64::from(trend) * TREND_WEIGHT + acceleration * ACCELERATION_WEIGHT
}

fn direction(change: f64) -> i32 {
    if change > 0.0 {
        1
    } else if change < 0.0 {
        -1
    } else {
        0
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickpulse_core::{Price, SignalKind};

    fn records(changes: &[f64]) -> Vec<PriceChangeRecord> {
        let mut price = 1_000.0;
        changes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                price += c;
                PriceChangeRecord::new(i as i64 * 1000, Price::new(price).unwrap(), c)
            })
            .collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_window_returns_previous() {
        let analyzer = MomentumAnalyzer::default();
        let previous = MomentumSnapshot {
            momentum_score: 12.5,
            trend_strength: -2,
            acceleration: 3.0,
            stats: ChangeStats::default(),
            signal: Signal::from_score(-10.0),
        };
        assert_eq!(analyzer.evaluate(&[], &previous), previous);
    }

    #[test]
    fn test_momentum_bounded() {
        for changes in [
            vec![1e9; 20],
            vec![-1e9; 20],
            vec![1e-9, -1e-9, 5.0],
            vec![-500.0, 0.001],
        ] {
            let m = momentum_score(&changes);
            assert!((-100.0..=100.0).contains(&m), "momentum {m} out of range");
        }
    }

    #[test]
    fn test_momentum_weights_newest_most() {
        // 0.5 * 0.01 + 1.0 * 0.02 = 0.025 -> 2.5
        assert!(approx(momentum_score(&[0.01, 0.02]), 2.5));
        // Same moves reversed weigh differently
        assert!(momentum_score(&[-0.1, 0.1]) > 0.0);
        assert!(momentum_score(&[0.1, -0.1]) < 0.0);
    }

    #[test]
    fn test_trend_run_breaks_on_reversal() {
        assert_eq!(trend_strength(&[1.0, 1.0, 1.0, -1.0, 1.0]), 1);
        assert_eq!(trend_strength(&[1.0, -1.0, -1.0, -1.0]), -3);
        assert_eq!(trend_strength(&[]), 0);
        assert_eq!(trend_strength(&[0.0, 0.0]), 0);
    }

    #[test]
    fn test_trend_skips_zero_changes() {
        assert_eq!(trend_strength(&[1.0, 0.0, 1.0, 0.0]), 2);
        assert_eq!(trend_strength(&[-1.0, 0.0, 1.0]), 1);
    }

    #[test]
    fn test_trend_uses_last_ten_only() {
        let analyzer = MomentumAnalyzer::default();
        let mut changes = vec![1.0; 15];
        changes[4] = -1.0;
        let snap = analyzer.evaluate(&records(&changes), &MomentumSnapshot::default());
        assert_eq!(snap.trend_strength, 10);
    }

    #[test]
    fn test_acceleration_split() {
        // Even: [1, 1] vs [3, 3]
        assert!(approx(acceleration(&[1.0, 1.0, 3.0, 3.0]), 200.0));
        // Odd: middle goes to the second half, [1, 1] vs [1, -1, 1]
        assert!(approx(
            acceleration(&[1.0, 1.0, 1.0, -1.0, 1.0]),
            (1.0 / 3.0 - 1.0) * 100.0
        ));
    }

    #[test]
    fn test_acceleration_kept_below_threshold() {
        let analyzer = MomentumAnalyzer::default();
        let previous = MomentumSnapshot {
            acceleration: 42.0,
            ..Default::default()
        };
        let snap = analyzer.evaluate(&records(&[1.0, 2.0, 3.0, 4.0]), &previous);
        assert_eq!(snap.acceleration, 42.0);

        let snap = analyzer.evaluate(&records(&[1.0, 2.0, 3.0, 4.0, 5.0]), &previous);
        assert!(approx(snap.acceleration, (4.0 - 1.5) * 100.0));
    }

    #[test]
    fn test_equal_moves_saturate_momentum_without_acceleration() {
        let analyzer = MomentumAnalyzer::default();
        let snap = analyzer.evaluate(&records(&[2.0; 20]), &MomentumSnapshot::default());
        assert_eq!(snap.momentum_score, 100.0);
        assert!(approx(snap.acceleration, 0.0));
        assert_eq!(snap.trend_strength, 10);
        assert_eq!(snap.signal.kind, SignalKind::StrongUp);
    }

    #[test]
    fn test_window_limited_to_newest() {
        let analyzer = MomentumAnalyzer::default();
        let mut changes = vec![-50.0; 10];
        changes.extend(vec![0.5; 20]);
        let snap = analyzer.evaluate(&records(&changes), &MomentumSnapshot::default());
        assert!(approx(snap.stats.total_change, 10.0));
        assert_eq!(snap.stats.max_down, 0.0);
    }

    #[test]
    fn test_stats_never_opposite_signed() {
        let up = change_stats(&[0.5, 1.5, 0.25]);
        assert_eq!(up.max_up, 1.5);
        assert_eq!(up.max_down, 0.0);
        assert!(approx(up.total_change, 2.25));

        let down = change_stats(&[-0.5, -2.0]);
        assert_eq!(down.max_up, 0.0);
        assert_eq!(down.max_down, -2.0);
    }

    #[test]
    fn test_signal_score_combines_components() {
        assert!(approx(signal_score(10.0, 2, -20.0), 20.0));
        assert!(approx(signal_score(-30.0, -3, 0.0), -60.0));
    }

    #[test]
    fn test_mixed_window_classification() {
        let analyzer = MomentumAnalyzer::default();
        let snap = analyzer.evaluate(
            &records(&[1.0, 1.0, 1.0, -1.0, 1.0]),
            &MomentumSnapshot::default(),
        );
        assert_eq!(snap.trend_strength, 1);
        assert_eq!(snap.momentum_score, 100.0);
        let expected = 100.0 + 10.0 + (1.0 / 3.0 - 1.0) * 100.0 * 0.5;
        assert!(approx(snap.signal.score, expected));
        assert_eq!(snap.signal.kind, SignalKind::StrongUp);
    }

    #[test]
    fn test_small_moves_stay_neutral() {
        let analyzer = MomentumAnalyzer::default();
        let snap = analyzer.evaluate(
            &records(&[0.01, -0.01, 0.01, -0.01, 0.01, -0.01]),
            &MomentumSnapshot::default(),
        );
        assert_eq!(snap.trend_strength, -1);
        assert_eq!(snap.signal.kind, SignalKind::Neutral);
    }
}
