//! signalbt runner: backtest orchestration, metrics, configuration, search.
//!
//! This crate builds on `signalbt-core` to provide:
//! - CSV loading of price series and precomputed signal bars
//! - TOML configuration with historical defaults
//! - Single-backtest runner (signal feed, engine, metrics)
//! - Performance analyzer (Sharpe, Sortino, Calmar, drawdown, win rate)
//! - Hyperparameter search with random, grid and local-search samplers
//! - JSON/CSV/Markdown export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod fitness;
pub mod metrics;
pub mod rng;
pub mod runner;
pub mod search;

pub use config::{BacktestConfig, ConfigError};
pub use data_loader::{load_bars, load_prices, LoadError};
pub use fitness::Objective;
pub use metrics::{AnalysisConfig, DrawdownMode, MetricsError, PerformanceMetrics};
pub use rng::RngHierarchy;
pub use runner::{
    run_backtest, run_backtest_from_bars, run_backtest_from_prices, run_backtest_precomputed,
    run_search, BacktestObjective, RunError, RunResult,
};
pub use search::{
    BestResult, ParameterSpace, SamplerKind, SearchConfig, SearchError, SearchHarness,
    SearchOutcome, TrialRecord,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn performance_metrics_is_send_sync() {
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
    }

    #[test]
    fn run_result_is_send_sync() {
        assert_send::<RunResult>();
        assert_sync::<RunResult>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
        assert_send::<SearchConfig>();
        assert_sync::<SearchConfig>();
    }

    #[test]
    fn search_types_are_send_sync() {
        assert_send::<SearchHarness>();
        assert_sync::<SearchHarness>();
        assert_send::<SearchOutcome>();
        assert_sync::<SearchOutcome>();
        assert_send::<TrialRecord>();
        assert_sync::<TrialRecord>();
    }

    #[test]
    fn error_types_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
