//! Serializable backtest configuration, loaded from TOML.
//!
//! Every section and field has a default, so an empty file reproduces the
//! historical setup: 1,000,000 starting capital, majority vote, the
//! fixed-parameter strategy, relative drawdown, and a 50-trial search.

use std::path::Path;

use serde::{Deserialize, Serialize};
use signalbt_core::domain::{ParamError, StrategyParameters};
use signalbt_core::engine::{AggregationPolicy, EngineConfig, TerminalPolicy};
use signalbt_core::feed::{FeedConfig, FeedError};
use thiserror::Error;

use crate::metrics::AnalysisConfig;
use crate::search::{SearchConfig, SearchError};

/// Unique identifier for a backtest configuration (content-addressable hash).
pub type RunId = String;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("[strategy] {0}")]
    Params(#[from] ParamError),
    #[error("[feed] {0}")]
    Feed(#[from] FeedError),
    #[error("[search] {0}")]
    Search(#[from] SearchError),
    #[error("[backtest] initial_capital must be finite and positive, got {0}")]
    InitialCapital(f64),
    #[error("[analysis] annualization must be finite and positive, got {0}")]
    ScaleFactor(f64),
}

/// The `[backtest]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub initial_capital: f64,
    pub aggregation: AggregationPolicy,
    pub terminal: TerminalPolicy,
}

impl Default for BacktestSection {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            initial_capital: engine.initial_capital,
            aggregation: engine.aggregation,
            terminal: engine.terminal,
        }
    }
}

/// Complete configuration for a backtest and an optional search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub strategy: StrategyParameters,
    pub feed: FeedConfig,
    pub analysis: AnalysisConfig,
    pub search: SearchConfig,
}

impl BacktestConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let capital = self.backtest.initial_capital;
        if !capital.is_finite() || capital <= 0.0 {
            return Err(ConfigError::InitialCapital(capital));
        }
        self.strategy.validate()?;
        self.feed.validate()?;
        if let Some(scale) = self.analysis.annualization {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(ConfigError::ScaleFactor(scale));
            }
        }
        self.search.validate()?;
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(self.backtest.initial_capital)
            .with_aggregation(self.backtest.aggregation)
            .with_terminal(self.backtest.terminal)
    }

    /// Computes a deterministic hash ID for this configuration.
    ///
    /// Two configurations with identical contents have the same RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        let hash = blake3::hash(json.as_bytes());
        Ok(hash.to_hex().to_string())
    }
}
