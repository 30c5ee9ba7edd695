//! Signal feed: turns raw `(timestamp, close)` points into engine bars.
//!
//! Every indicator is computed once over the full close series, then each bar
//! gets its six boolean flags:
//!
//! - `RSI_BUY` / `RSI_SELL`: RSI below the lower / above the upper threshold
//! - `BB_BUY` / `BB_SELL`: close below the lower / above the upper band
//! - `MACD_BUY` / `MACD_SELL`: MACD histogram above / below zero
//!
//! Bars where any indicator is still warming up are dropped, so the first
//! emitted bar is the first one with every flag defined.

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Bar, PricePoint, SignalName, SignalSet, StrategyParameters};
use crate::indicators::{Bollinger, Indicator, Macd, Rsi};

/// Indicator windows that are not strategy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub bb_window: usize,
    pub bb_std_devs: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            bb_window: 15,
            bb_std_devs: 2.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeedError {
    #[error("{0} must be >= 1")]
    ZeroWindow(&'static str),
    #[error("bb_std_devs must be finite and positive, got {0}")]
    BandWidth(f64),
    #[error("macd_fast ({fast}) must be shorter than macd_slow ({slow})")]
    MacdWindows { fast: usize, slow: usize },
    #[error("need more than {warmup} price points to emit a bar, got {available}")]
    InsufficientHistory { warmup: usize, available: usize },
}

impl FeedConfig {
    pub fn validate(&self) -> Result<(), FeedError> {
        for (name, window) in [
            ("bb_window", self.bb_window),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
        ] {
            if window == 0 {
                return Err(FeedError::ZeroWindow(name));
            }
        }
        if !self.bb_std_devs.is_finite() || self.bb_std_devs <= 0.0 {
            return Err(FeedError::BandWidth(self.bb_std_devs));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(FeedError::MacdWindows {
                fast: self.macd_fast,
                slow: self.macd_slow,
            });
        }
        Ok(())
    }
}

/// The indicator set for one parameterization.
struct FeedIndicators {
    rsi: Rsi,
    bb_upper: Bollinger,
    bb_lower: Bollinger,
    macd_hist: Macd,
}

impl FeedIndicators {
    fn new(params: &StrategyParameters, feed: &FeedConfig) -> Self {
        Self {
            rsi: Rsi::new(params.rsi_window),
            bb_upper: Bollinger::upper(feed.bb_window, feed.bb_std_devs),
            bb_lower: Bollinger::lower(feed.bb_window, feed.bb_std_devs),
            macd_hist: Macd::histogram(feed.macd_fast, feed.macd_slow, feed.macd_signal),
        }
    }

    fn warmup(&self) -> usize {
        [
            self.rsi.lookback(),
            self.bb_upper.lookback(),
            self.bb_lower.lookback(),
            self.macd_hist.lookback(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Number of leading price points consumed by indicator warmup.
pub fn warmup_bars(params: &StrategyParameters, feed: &FeedConfig) -> usize {
    FeedIndicators::new(params, feed).warmup()
}

/// Build engine bars from raw prices.
///
/// A bar at index `t` depends only on `prices[..=t]`.
pub fn build_signal_feed(
    prices: &[PricePoint],
    params: &StrategyParameters,
    feed: &FeedConfig,
) -> Result<Vec<Bar>, FeedError> {
    feed.validate()?;
    let indicators = FeedIndicators::new(params, feed);
    let warmup = indicators.warmup();
    if prices.len() <= warmup {
        return Err(FeedError::InsufficientHistory {
            warmup,
            available: prices.len(),
        });
    }

    let closes: Vec<f64> = prices.iter().map(|p| p.close).collect();
    let rsi = indicators.rsi.compute(&closes);
    let upper = indicators.bb_upper.compute(&closes);
    let lower = indicators.bb_lower.compute(&closes);
    let hist = indicators.macd_hist.compute(&closes);

    let bars: Vec<Bar> = prices
        .iter()
        .enumerate()
        .filter(|&(i, _)| {
            [rsi[i], upper[i], lower[i], hist[i]]
                .iter()
                .all(|v| v.is_finite())
        })
        .map(|(i, point)| {
            let close = point.close;
            let signals = SignalSet::from_pairs([
                (SignalName::RsiBuy, rsi[i] < params.rsi_lower_threshold),
                (SignalName::RsiSell, rsi[i] > params.rsi_upper_threshold),
                (SignalName::BbBuy, close < lower[i]),
                (SignalName::BbSell, close > upper[i]),
                (SignalName::MacdBuy, hist[i] > 0.0),
                (SignalName::MacdSell, hist[i] < 0.0),
            ]);
            Bar::new(point.timestamp, close, signals)
        })
        .collect();

    debug!(
        "signal feed: {} price points, warmup {}, {} bars emitted",
        prices.len(),
        warmup,
        bars.len()
    );
    Ok(bars)
}
