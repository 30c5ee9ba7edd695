//! Fitness function: configurable metric selector for search objectives.

use crate::metrics::PerformanceMetrics;
use serde::{Deserialize, Serialize};

/// Which metric the search maximizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    Sharpe,
    Sortino,
    Calmar,
    WinRate,
    FinalValue,
}

impl Objective {
    /// Extract the relevant metric value from a PerformanceMetrics struct.
    pub fn extract(&self, metrics: &PerformanceMetrics) -> f64 {
        match self {
            Self::Sharpe => metrics.sharpe,
            Self::Sortino => metrics.sortino,
            Self::Calmar => metrics.calmar,
            Self::WinRate => metrics.win_rate,
            Self::FinalValue => metrics.final_value,
        }
    }

    /// Every objective is maximized; a NaN never beats anything.
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        a > b
    }
}
