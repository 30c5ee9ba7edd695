//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve and/or trade tally in,
//! scalar out. No dependencies on the runner, the feed, or the engine loop.
//!
//! Conventions:
//! - Returns are simple per-bar returns `(E[i+1] - E[i]) / E[i]`.
//! - Standard deviations are population (divide by N).
//! - Ratios with a zero denominator are 0, never NaN or infinity.

use serde::{Deserialize, Serialize};
use signalbt_core::domain::TradeTally;
use thiserror::Error;

/// Errors from metric computation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    #[error("equity curve is empty")]
    EmptyCurve,
    #[error("equity is zero at point {index}, per-bar return undefined")]
    DivisionByZero { index: usize },
    #[error("annualization factor must be finite and positive, got {0}")]
    ScaleFactor(f64),
}

/// How drawdown is measured against the running peak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawdownMode {
    /// `peak - equity`, in currency.
    Absolute,
    /// `(peak - equity) / peak`, as a fraction.
    #[default]
    Relative,
}

/// Analyzer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub drawdown: DrawdownMode,
    /// Bars per year; Sharpe, Sortino and Calmar are scaled by its square root.
    pub annualization: Option<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            drawdown: DrawdownMode::Relative,
            annualization: Some(DEFAULT_ANNUALIZATION),
        }
    }
}

/// Five-minute bars per year used in the historical runs
/// (78 bars a day over 252 sessions).
pub const DEFAULT_ANNUALIZATION: f64 = 19_656.0;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub final_value: f64,
    pub total_return: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub max_drawdown: f64,
    /// Percentage, 0 to 100.
    pub win_rate: f64,
    pub wins: u64,
    pub losses: u64,
    pub trade_count: u64,
}

impl PerformanceMetrics {
    /// Compute all metrics from an equity curve and trade tally.
    pub fn compute(
        equity_curve: &[f64],
        tally: &TradeTally,
        config: &AnalysisConfig,
    ) -> Result<Self, MetricsError> {
        let first = *equity_curve.first().ok_or(MetricsError::EmptyCurve)?;
        let final_value = *equity_curve.last().ok_or(MetricsError::EmptyCurve)?;
        let returns = bar_returns(equity_curve)?;

        let scale = match config.annualization {
            Some(s) if s.is_finite() && s > 0.0 => s.sqrt(),
            Some(s) => return Err(MetricsError::ScaleFactor(s)),
            None => 1.0,
        };

        let max_dd = max_drawdown(equity_curve, config.drawdown);
        if first == 0.0 {
            return Err(MetricsError::DivisionByZero { index: 0 });
        }
        let total_return = (final_value - first) / first;

        Ok(Self {
            final_value,
            total_return,
            sharpe: sharpe_ratio(&returns) * scale,
            sortino: sortino_ratio(&returns) * scale,
            calmar: calmar_ratio(&returns, max_dd) * scale,
            max_drawdown: max_dd,
            win_rate: win_rate(tally),
            wins: tally.wins,
            losses: tally.losses,
            trade_count: tally.total(),
        })
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Per-bar simple returns. A zero equity point makes the next return undefined.
pub fn bar_returns(equity_curve: &[f64]) -> Result<Vec<f64>, MetricsError> {
    equity_curve
        .windows(2)
        .enumerate()
        .map(|(index, w)| {
            if w[0] == 0.0 {
                Err(MetricsError::DivisionByZero { index })
            } else {
                Ok((w[1] - w[0]) / w[0])
            }
        })
        .collect()
}

/// Sharpe ratio (no risk-free rate, unscaled): mean / population std.
///
/// Returns 0.0 when the standard deviation is zero or there are no returns.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    let std = std_dev(returns);
    if std < STD_EPSILON {
        return 0.0;
    }
    mean_f64(returns) / std
}

/// Sortino ratio (unscaled): mean of all returns over the population std of
/// the negative returns only.
///
/// Returns 0.0 when no return is negative or the negative returns are all equal.
pub fn sortino_ratio(returns: &[f64]) -> f64 {
    let downside: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    if downside.is_empty() {
        return 0.0;
    }
    let downside_std = std_dev(&downside);
    if downside_std < STD_EPSILON {
        return 0.0;
    }
    mean_f64(returns) / downside_std
}

/// Drawdown series against the running peak, one value per equity point.
pub fn drawdown_series(equity_curve: &[f64], mode: DrawdownMode) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity_curve
        .iter()
        .map(|&eq| {
            peak = peak.max(eq);
            let dd = peak - eq;
            match mode {
                DrawdownMode::Absolute => dd,
                DrawdownMode::Relative if peak > 0.0 => dd / peak,
                DrawdownMode::Relative => 0.0,
            }
        })
        .collect()
}

/// Largest drawdown, as a non-negative number (0.0 for a monotone curve).
pub fn max_drawdown(equity_curve: &[f64], mode: DrawdownMode) -> f64 {
    drawdown_series(equity_curve, mode)
        .into_iter()
        .fold(0.0, f64::max)
}

/// Calmar ratio (unscaled): mean per-bar return over max drawdown.
///
/// Returns 0.0 if max drawdown is zero.
pub fn calmar_ratio(returns: &[f64], max_drawdown: f64) -> f64 {
    if max_drawdown <= 0.0 {
        return 0.0;
    }
    mean_f64(returns) / max_drawdown
}

/// Win rate as a percentage of closed trades.
pub fn win_rate(tally: &TradeTally) -> f64 {
    let total = tally.total();
    if total == 0 {
        return 0.0;
    }
    tally.wins as f64 / total as f64 * 100.0
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Below this a standard deviation is treated as zero (float noise on a
/// constant series).
const STD_EPSILON: f64 = 1e-15;

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean_f64(values);
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}
