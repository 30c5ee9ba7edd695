//! Indicator implementations backing the signal feed.
//!
//! Indicators are pure functions: close history in, numeric series out, same
//! length as the input. They are computed once per feed, never per bar.
//!
//! Bollinger bands are separate named instances per band and MACD exposes
//! only its histogram, keeping the single-series `Indicator` trait unchanged.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;

pub use bollinger::{Bollinger, BollingerBand};
pub use ema::{ema_of_series, Ema};
pub use macd::Macd;
pub use rsi::Rsi;

/// Trait for indicators over a close series.
///
/// The first `lookback()` values are `f64::NAN` (warmup).
///
/// # Look-ahead contamination guard
/// No value at bar t may depend on a close from bar t+1 or later. Every
/// indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "rsi_14", "bollinger_lower_15_2").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire close series.
    fn compute(&self, closes: &[f64]) -> Vec<f64>;
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
