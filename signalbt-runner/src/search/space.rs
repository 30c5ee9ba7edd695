//! Parameter space: the declared domain of every searched strategy parameter.
//!
//! A sample is a `Vec<f64>` with one value per dimension, in the dimension's
//! own units. Integer and categorical values are carried as whole `f64`s and
//! converted when applied to `StrategyParameters`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use signalbt_core::domain::StrategyParameters;

use super::SearchError;

/// Which strategy parameter a dimension controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKey {
    RsiWindow,
    RsiLowerThreshold,
    RsiUpperThreshold,
    StopLossFraction,
    TakeProfitFraction,
    SharesPerTrade,
    CommissionRate,
}

impl ParamKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RsiWindow => "rsi_window",
            Self::RsiLowerThreshold => "rsi_lower_threshold",
            Self::RsiUpperThreshold => "rsi_upper_threshold",
            Self::StopLossFraction => "stop_loss_fraction",
            Self::TakeProfitFraction => "take_profit_fraction",
            Self::SharesPerTrade => "shares_per_trade",
            Self::CommissionRate => "commission_rate",
        }
    }

    /// Write `value` into the matching field.
    pub fn apply(&self, params: &mut StrategyParameters, value: f64) {
        match self {
            Self::RsiWindow => params.rsi_window = value.round().max(0.0) as usize,
            Self::RsiLowerThreshold => params.rsi_lower_threshold = value,
            Self::RsiUpperThreshold => params.rsi_upper_threshold = value,
            Self::StopLossFraction => params.stop_loss_fraction = value,
            Self::TakeProfitFraction => params.take_profit_fraction = value,
            Self::SharesPerTrade => params.shares_per_trade = value.round().max(0.0) as u64,
            Self::CommissionRate => params.commission_rate = value,
        }
    }
}

/// The set of values one parameter may take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamDomain {
    /// Integers in `low..=high`.
    Int { low: i64, high: i64 },
    /// Reals in `[low, high]`.
    Float { low: f64, high: f64 },
    /// One of an explicit list of values.
    Categorical { choices: Vec<f64> },
}

impl ParamDomain {
    fn check(&self) -> Result<(), String> {
        match self {
            Self::Int { low, high } if low > high => Err(format!("low {low} > high {high}")),
            Self::Float { low, high } if !low.is_finite() || !high.is_finite() => {
                Err("bounds must be finite".into())
            }
            Self::Float { low, high } if low > high => Err(format!("low {low} > high {high}")),
            Self::Categorical { choices } if choices.is_empty() => Err("no choices".into()),
            Self::Categorical { choices } if choices.iter().any(|c| !c.is_finite()) => {
                Err("choices must be finite".into())
            }
            _ => Ok(()),
        }
    }

    /// Draw a uniform value from the domain.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Self::Int { low, high } => rng.gen_range(*low..=*high) as f64,
            Self::Float { low, high } => low + rng.gen::<f64>() * (high - low),
            Self::Categorical { choices } => choices[rng.gen_range(0..choices.len())],
        }
    }

    /// Snap an arbitrary value onto the domain.
    pub fn snap(&self, value: f64) -> f64 {
        match self {
            Self::Int { low, high } => value.round().clamp(*low as f64, *high as f64),
            Self::Float { low, high } => value.clamp(*low, *high),
            Self::Categorical { choices } => choices
                .iter()
                .copied()
                .min_by(|a, b| (a - value).abs().total_cmp(&(b - value).abs()))
                .unwrap_or(value),
        }
    }

    /// Perturb `value` by up to `scale` of the domain's width.
    ///
    /// Numeric domains move uniformly within `value ± width * scale / 2`;
    /// categorical domains jump to a random choice with probability `scale`.
    pub fn perturb<R: Rng + ?Sized>(&self, value: f64, scale: f64, rng: &mut R) -> f64 {
        match self {
            Self::Int { low, high } => {
                let spread = (high - low) as f64;
                let base = value - spread * scale / 2.0;
                let offset = rng.gen::<f64>() * spread * scale;
                self.snap(base + offset)
            }
            Self::Float { low, high } => {
                let spread = high - low;
                let base = value - spread * scale / 2.0;
                let offset = rng.gen::<f64>() * spread * scale;
                self.snap(base + offset)
            }
            Self::Categorical { .. } => {
                if rng.gen::<f64>() < scale {
                    self.sample(rng)
                } else {
                    value
                }
            }
        }
    }

    /// Up to `steps` evenly spaced values covering the domain.
    pub fn grid(&self, steps: usize) -> Vec<f64> {
        let steps = steps.max(1);
        match self {
            Self::Int { low, high } => {
                let count = (high - low) as u64 + 1;
                if count <= steps as u64 {
                    return (*low..=*high).map(|v| v as f64).collect();
                }
                let mut values: Vec<f64> = linspace(*low as f64, *high as f64, steps)
                    .into_iter()
                    .map(f64::round)
                    .collect();
                values.dedup();
                values
            }
            Self::Float { low, high } => linspace(*low, *high, steps),
            Self::Categorical { choices } => choices.clone(),
        }
    }
}

fn linspace(low: f64, high: f64, steps: usize) -> Vec<f64> {
    if steps == 1 || low == high {
        return vec![(low + high) / 2.0];
    }
    let step = (high - low) / (steps - 1) as f64;
    (0..steps).map(|i| low + step * i as f64).collect()
}

/// One searched dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDimension {
    pub key: ParamKey,
    #[serde(flatten)]
    pub domain: ParamDomain,
}

/// Ordered list of searched dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSpace {
    dims: Vec<ParamDimension>,
}

impl Default for ParameterSpace {
    /// The space of the historical tuning runs.
    fn default() -> Self {
        Self::new(vec![
            ParamDimension {
                key: ParamKey::RsiWindow,
                domain: ParamDomain::Int { low: 10, high: 100 },
            },
            ParamDimension {
                key: ParamKey::RsiLowerThreshold,
                domain: ParamDomain::Int { low: 5, high: 35 },
            },
            ParamDimension {
                key: ParamKey::RsiUpperThreshold,
                domain: ParamDomain::Int { low: 65, high: 95 },
            },
            ParamDimension {
                key: ParamKey::StopLossFraction,
                domain: ParamDomain::Float {
                    low: 0.01,
                    high: 0.2,
                },
            },
            ParamDimension {
                key: ParamKey::TakeProfitFraction,
                domain: ParamDomain::Float {
                    low: 0.01,
                    high: 0.2,
                },
            },
            ParamDimension {
                key: ParamKey::SharesPerTrade,
                domain: ParamDomain::Categorical {
                    choices: vec![1_000.0, 2_000.0, 3_000.0, 3_500.0, 4_000.0],
                },
            },
        ])
    }
}

impl ParameterSpace {
    pub fn new(dims: Vec<ParamDimension>) -> Self {
        Self { dims }
    }

    pub fn dims(&self) -> &[ParamDimension] {
        &self.dims
    }

    pub fn len(&self) -> usize {
        self.dims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    /// Reject empty spaces, malformed domains and repeated keys.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.dims.is_empty() {
            return Err(SearchError::EmptySpace);
        }
        for (i, dim) in self.dims.iter().enumerate() {
            dim.domain.check().map_err(|reason| SearchError::InvalidDomain {
                key: dim.key.as_str(),
                reason,
            })?;
            if self.dims[..i].iter().any(|d| d.key == dim.key) {
                return Err(SearchError::DuplicateKey(dim.key.as_str()));
            }
        }
        Ok(())
    }

    /// Uniform sample across every dimension.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        self.dims.iter().map(|d| d.domain.sample(rng)).collect()
    }

    /// Overlay a sample onto `base`; parameters outside the space keep their
    /// base values.
    pub fn apply(&self, base: &StrategyParameters, values: &[f64]) -> StrategyParameters {
        let mut params = base.clone();
        for (dim, &value) in self.dims.iter().zip(values) {
            dim.key.apply(&mut params, value);
        }
        params
    }
}
