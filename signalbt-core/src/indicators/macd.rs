//! MACD histogram.
//!
//! - MACD line: EMA(close, fast) - EMA(close, slow)
//! - Signal line: EMA(MACD line, signal), seeded once the MACD line is defined
//! - Histogram: MACD line - signal line
//!
//! Only the histogram is exposed. Lookback: (slow - 1) + (signal - 1).

use super::ema::ema_of_series;
use super::Indicator;

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    name: String,
}

impl Macd {
    /// MACD minus its signal line; the series the feed thresholds at zero.
    pub fn histogram(fast: usize, slow: usize, signal: usize) -> Self {
        let (fast, slow, signal) = (fast.max(1), slow.max(1), signal.max(1));
        Self {
            fast,
            slow,
            signal,
            name: format!("macd_hist_{fast}_{slow}_{signal}"),
        }
    }

    fn macd_lookback(&self) -> usize {
        self.fast.max(self.slow).saturating_sub(1)
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.macd_lookback() + self.signal - 1
    }

    fn compute(&self, closes: &[f64]) -> Vec<f64> {
        let n = closes.len();
        let fast = ema_of_series(closes, self.fast);
        let slow = ema_of_series(closes, self.slow);
        let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();

        let mut result = vec![f64::NAN; n];
        let start = self.macd_lookback();
        if start >= n {
            return result;
        }
        // The signal EMA is seeded from the first defined MACD values.
        let signal = ema_of_series(&macd[start..], self.signal);
        for (offset, &sig) in signal.iter().enumerate() {
            let i = start + offset;
            result[i] = macd[i] - sig;
        }
        result
    }
}
