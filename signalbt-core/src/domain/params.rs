//! Strategy parameters: the flat record the engine and the signal feed read.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameters supplied once per run. The search harness varies these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParameters {
    pub rsi_window: usize,
    pub rsi_lower_threshold: f64,
    pub rsi_upper_threshold: f64,
    pub stop_loss_fraction: f64,
    pub take_profit_fraction: f64,
    pub shares_per_trade: u64,
    pub commission_rate: f64,
}

impl Default for StrategyParameters {
    /// The fixed-parameter variant of the strategy: RSI(20) below 25 / above
    /// 75, 5% stop and target, 1000 shares, 0.125% commission.
    fn default() -> Self {
        Self {
            rsi_window: 20,
            rsi_lower_threshold: 25.0,
            rsi_upper_threshold: 75.0,
            stop_loss_fraction: 0.05,
            take_profit_fraction: 0.05,
            shares_per_trade: 1_000,
            commission_rate: 0.00125,
        }
    }
}

/// Parameter values that make a run meaningless.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("rsi_window must be >= 1")]
    ZeroRsiWindow,
    #[error("rsi thresholds must satisfy 0 <= lower ({lower}) < upper ({upper}) <= 100")]
    RsiThresholds { lower: f64, upper: f64 },
    #[error("{name} must be in [0, 1), got {value}")]
    FractionOutOfRange { name: &'static str, value: f64 },
    #[error("shares_per_trade must be > 0")]
    ZeroShares,
    #[error("commission_rate must be in [0, 1), got {0}")]
    Commission(f64),
}

impl StrategyParameters {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.rsi_window == 0 {
            return Err(ParamError::ZeroRsiWindow);
        }
        let (lower, upper) = (self.rsi_lower_threshold, self.rsi_upper_threshold);
        if !(0.0..=100.0).contains(&lower) || !(0.0..=100.0).contains(&upper) || lower >= upper {
            return Err(ParamError::RsiThresholds { lower, upper });
        }
        for (name, value) in [
            ("stop_loss_fraction", self.stop_loss_fraction),
            ("take_profit_fraction", self.take_profit_fraction),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(ParamError::FractionOutOfRange { name, value });
            }
        }
        if self.shares_per_trade == 0 {
            return Err(ParamError::ZeroShares);
        }
        if !(0.0..1.0).contains(&self.commission_rate) {
            return Err(ParamError::Commission(self.commission_rate));
        }
        Ok(())
    }
}
