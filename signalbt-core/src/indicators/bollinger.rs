//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! Two bands (separate Indicator instances) around SMA(close, period):
//! - Upper: sma + mult * stddev(close, period)
//! - Lower: sma - mult * stddev(close, period)
//!
//! Uses population stddev (divide by N).
//! Lookback: period - 1.

use super::Indicator;

/// Which band of the Bollinger Bands to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    pub fn new(band: BollingerBand, period: usize, multiplier: f64) -> Self {
        let period = period.max(1);
        let label = match band {
            BollingerBand::Upper => "upper",
            BollingerBand::Lower => "lower",
        };
        Self {
            period,
            multiplier,
            band,
            name: format!("bollinger_{label}_{period}_{multiplier}"),
        }
    }

    pub fn upper(period: usize, multiplier: f64) -> Self {
        Self::new(BollingerBand::Upper, period, multiplier)
    }

    pub fn lower(period: usize, multiplier: f64) -> Self {
        Self::new(BollingerBand::Lower, period, multiplier)
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, closes: &[f64]) -> Vec<f64> {
        let n = closes.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period {
            return result;
        }

        for (offset, window) in closes.windows(self.period).enumerate() {
            let i = offset + self.period - 1;
            if window.iter().any(|c| c.is_nan()) {
                continue;
            }

            let mean = window.iter().sum::<f64>() / self.period as f64;
            let variance = window
                .iter()
                .map(|c| {
                    let diff = c - mean;
                    diff * diff
                })
                .sum::<f64>()
                / self.period as f64;
            let width = self.multiplier * variance.sqrt();

            result[i] = match self.band {
                BollingerBand::Upper => mean + width,
                BollingerBand::Lower => mean - width,
            };
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn bollinger_warmup_is_nan() {
        let result = Bollinger::lower(3, 2.0).compute(&[10.0, 11.0, 12.0, 13.0, 14.0]);

        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert!(result[2..].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn bollinger_upper_known_value() {
        // window (10, 11, 12): mean 11, population variance 2/3
        let result = Bollinger::upper(3, 2.0).compute(&[10.0, 11.0, 12.0]);
        assert_approx(result[2], 11.0 + 2.0 * (2.0f64 / 3.0).sqrt(), 1e-12);
    }

    #[test]
    fn bollinger_bands_centered_on_sma() {
        let closes = [10.0, 11.0, 12.0, 13.0, 14.0];
        let upper = Bollinger::upper(3, 2.0).compute(&closes);
        let lower = Bollinger::lower(3, 2.0).compute(&closes);

        for i in 2..5 {
            let sma = (closes[i - 2] + closes[i - 1] + closes[i]) / 3.0;
            assert_approx((upper[i] + lower[i]) / 2.0, sma, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn bollinger_constant_price_zero_width() {
        let closes = [100.0, 100.0, 100.0, 100.0];
        assert_approx(Bollinger::upper(3, 2.0).compute(&closes)[2], 100.0, DEFAULT_EPSILON);
        assert_approx(Bollinger::lower(3, 2.0).compute(&closes)[2], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_nan_propagation() {
        let result = Bollinger::upper(3, 2.0).compute(&[10.0, 11.0, f64::NAN, 13.0]);
        assert!(result[2].is_nan());
        assert!(result[3].is_nan());
    }

    #[test]
    fn bollinger_lookback_and_name() {
        let bb = Bollinger::lower(15, 2.0);
        assert_eq!(bb.lookback(), 14);
        assert_eq!(bb.name(), "bollinger_lower_15_2");
    }
}
