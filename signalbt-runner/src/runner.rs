//! Backtest runner: wires together signal feed, engine, and metrics.
//!
//! Entry points:
//! - `run_backtest()`: raw prices + full config. Used by the CLI `run` command.
//! - `run_backtest_precomputed()`: bars that already carry signal flags.
//! - `run_backtest_from_prices()` / `run_backtest_from_bars()`: explicit
//!   pieces, no config file. Used by the search objective.
//! - `run_search()`: the search harness over `BacktestObjective`.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};
use signalbt_core::domain::{
    Bar, Position, PricePoint, StrategyParameters, TradeRecord, TradeTally,
};
use signalbt_core::engine::{run_simulation, EngineConfig, SimulationError};
use signalbt_core::feed::{build_signal_feed, FeedConfig, FeedError};
use thiserror::Error;

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::LoadError;
use crate::fitness::Objective;
use crate::metrics::{AnalysisConfig, MetricsError, PerformanceMetrics};
use crate::search::{SearchError, SearchHarness, SearchOutcome};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("signal feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),
    #[error("search error: {0}")]
    Search(#[from] SearchError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub params: StrategyParameters,
    pub initial_capital: f64,
    pub metrics: PerformanceMetrics,
    pub equity_curve: Vec<f64>,
    pub trade_tally: TradeTally,
    pub trades: Vec<TradeRecord>,
    pub open_positions: Vec<Position>,
    pub commission_paid: f64,
    pub skipped_entries: usize,
    pub bar_count: usize,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run a backtest over raw prices using every section of `config`.
pub fn run_backtest(config: &BacktestConfig, prices: &[PricePoint]) -> Result<RunResult, RunError> {
    config.validate()?;
    run_backtest_from_prices(
        prices,
        &config.strategy,
        &config.feed,
        &config.engine_config(),
        &config.analysis,
    )
}

/// Run a backtest over bars that already carry their signal flags.
pub fn run_backtest_precomputed(config: &BacktestConfig, bars: &[Bar]) -> Result<RunResult, RunError> {
    config.validate()?;
    run_backtest_from_bars(
        bars,
        &config.strategy,
        &config.engine_config(),
        &config.analysis,
    )
}

/// Build the signal feed for `params`, then simulate and analyze.
pub fn run_backtest_from_prices(
    prices: &[PricePoint],
    params: &StrategyParameters,
    feed: &FeedConfig,
    engine: &EngineConfig,
    analysis: &AnalysisConfig,
) -> Result<RunResult, RunError> {
    let bars = build_signal_feed(prices, params, feed)?;
    run_backtest_from_bars(&bars, params, engine, analysis)
}

/// Simulate over prebuilt bars and analyze. No I/O.
pub fn run_backtest_from_bars(
    bars: &[Bar],
    params: &StrategyParameters,
    engine: &EngineConfig,
    analysis: &AnalysisConfig,
) -> Result<RunResult, RunError> {
    let sim = run_simulation(bars, params, engine)?;
    let metrics = PerformanceMetrics::compute(&sim.equity_curve, &sim.tally, analysis)?;

    debug!(
        "backtest: {} bars, {} trades, final value {:.2}, sharpe {:.4}",
        sim.bar_count,
        sim.tally.total(),
        metrics.final_value,
        metrics.sharpe
    );

    Ok(RunResult {
        schema_version: SCHEMA_VERSION,
        params: params.clone(),
        initial_capital: engine.initial_capital,
        metrics,
        equity_curve: sim.equity_curve,
        trade_tally: sim.tally,
        trades: sim.trades,
        open_positions: sim.open_positions,
        commission_paid: sim.commission_paid,
        skipped_entries: sim.skipped_entries,
        bar_count: sim.bar_count,
    })
}

// ─── Search ─────────────────────────────────────────────────────────

/// Objective for the search harness: a full backtest per parameter set,
/// scored by one metric.
pub struct BacktestObjective<'a> {
    prices: &'a [PricePoint],
    feed: &'a FeedConfig,
    engine: EngineConfig,
    analysis: &'a AnalysisConfig,
    objective: Objective,
}

impl<'a> BacktestObjective<'a> {
    pub fn new(config: &'a BacktestConfig, prices: &'a [PricePoint]) -> Self {
        Self {
            prices,
            feed: &config.feed,
            engine: config.engine_config(),
            analysis: &config.analysis,
            objective: config.search.objective,
        }
    }

    /// Each call builds its own feed and ledger; calls share nothing mutable.
    pub fn evaluate(&self, params: &StrategyParameters) -> Result<f64, RunError> {
        let result =
            run_backtest_from_prices(self.prices, params, self.feed, &self.engine, self.analysis)?;
        Ok(self.objective.extract(&result.metrics))
    }
}

/// Search `config.search.space` for the parameters maximizing
/// `config.search.objective`. Parameters outside the space come from
/// `config.strategy`.
pub fn run_search(
    config: &BacktestConfig,
    prices: &[PricePoint],
    cancel: Option<Arc<AtomicBool>>,
) -> Result<SearchOutcome, RunError> {
    config.validate()?;
    let objective = BacktestObjective::new(config, prices);
    let mut harness = SearchHarness::new(config.search.clone(), config.strategy.clone());
    if let Some(flag) = cancel {
        harness = harness.with_cancel(flag);
    }
    let outcome = harness.run(&config.search.space, config.search.n_trials, |params| {
        objective.evaluate(params)
    })?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use signalbt_core::domain::{SignalName, SignalSet};
    use signalbt_core::engine::AggregationPolicy;

    fn bar(minute: u32, close: f64, rsi_buy: bool) -> Bar {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, minute, 0)
            .unwrap();
        let signals = SignalSet::from_pairs([
            (SignalName::RsiBuy, rsi_buy),
            (SignalName::RsiSell, false),
        ]);
        Bar::new(ts, close, signals)
    }

    fn single_indicator() -> EngineConfig {
        EngineConfig::default().with_aggregation(AggregationPolicy::SingleIndicator)
    }

    #[test]
    fn single_bar_buy_matches_ledger_arithmetic() {
        let result = run_backtest_from_bars(
            &[bar(30, 100.0, true)],
            &StrategyParameters::default(),
            &single_indicator(),
            &AnalysisConfig::default(),
        )
        .unwrap();
        assert_eq!(result.equity_curve.len(), 2);
        assert!((result.equity_curve[1] - 999_875.0).abs() < 1e-6);
        assert_eq!(result.open_positions.len(), 1);
        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert_eq!(result.metrics.trade_count, 0);
    }

    #[test]
    fn engine_errors_surface() {
        let err = run_backtest_from_bars(
            &[],
            &StrategyParameters::default(),
            &single_indicator(),
            &AnalysisConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::Simulation(_)));
    }

    #[test]
    fn short_price_history_is_feed_error() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let prices = vec![PricePoint::new(ts, 100.0)];
        let err = run_backtest(&BacktestConfig::default(), &prices).unwrap_err();
        assert!(matches!(err, RunError::Feed(FeedError::InsufficientHistory { .. })));
    }

    #[test]
    fn result_serializes_with_schema_version() {
        let result = run_backtest_from_bars(
            &[bar(30, 100.0, false), bar(35, 101.0, false)],
            &StrategyParameters::default(),
            &single_indicator(),
            &AnalysisConfig::default(),
        )
        .unwrap();
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"schema_version\":1"));
        let back: RunResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.equity_curve.len(), result.equity_curve.len());
        assert_eq!(back.params, result.params);
    }
}
