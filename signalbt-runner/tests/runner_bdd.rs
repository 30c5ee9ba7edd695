//! BDD tests for the runner: config file + CSV in, metrics and search out.
//!
//! These tests exercise the full pipeline:
//! - TOML config loading with defaults
//! - CSV price loading and the indicator signal feed
//! - Single backtest execution and artifact export
//! - Hyperparameter search over the configured space

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use signalbt_core::domain::PricePoint;
use signalbt_core::engine::TerminalPolicy;
use signalbt_runner::export::{load_run_artifacts, save_run_artifacts, save_search_artifacts};
use signalbt_runner::{
    load_bars, load_prices, run_backtest, run_backtest_precomputed, run_search, BacktestConfig,
    Objective, RunError,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn synthetic_prices(n: usize) -> Vec<PricePoint> {
    let start = NaiveDate::from_ymd_opt(2021, 3, 1)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    (0..n)
        .map(|i| {
            let x = i as f64;
            let close = 100.0 + (x * 0.07).sin() * 8.0 + (x * 0.31).sin() * 3.0 + x * 0.01;
            PricePoint::new(start + Duration::minutes(5 * i as i64), close)
        })
        .collect()
}

fn write_price_csv(dir: &Path, prices: &[PricePoint]) -> std::path::PathBuf {
    let path = dir.join("prices.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "Datetime,Open,Close").unwrap();
    for p in prices {
        writeln!(
            file,
            "{},{:.4},{:.4}",
            p.timestamp.format("%Y-%m-%d %H:%M:%S"),
            p.close,
            p.close
        )
        .unwrap();
    }
    path
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn bdd_scenario_run_backtest_from_csv_with_default_config() {
    // GIVEN a price file and an empty config file
    let dir = tempfile::tempdir().unwrap();
    let csv = write_price_csv(dir.path(), &synthetic_prices(600));
    let config_path = dir.path().join("backtest.toml");
    std::fs::write(&config_path, "").unwrap();

    // WHEN the config and prices are loaded and the backtest runs
    let config = BacktestConfig::load(&config_path).unwrap();
    let prices = load_prices(&csv).unwrap();
    let result = run_backtest(&config, &prices).unwrap();

    // THEN the equity curve has one point per emitted bar plus the seed
    assert_eq!(result.equity_curve.len(), result.bar_count + 1);
    assert_eq!(result.equity_curve[0], 1_000_000.0);
    assert!(result.bar_count < prices.len());

    // AND the tally matches the trade log
    assert_eq!(result.trade_tally.total() as usize, result.trades.len());
    assert_eq!(result.metrics.trade_count, result.trade_tally.total());
    assert_eq!(result.metrics.final_value, *result.equity_curve.last().unwrap());
}

#[test]
fn bdd_scenario_force_close_leaves_nothing_open() {
    // GIVEN a single-indicator config that liquidates at the end
    let config = BacktestConfig::from_toml_str(
        r#"
        [backtest]
        aggregation = "single_indicator"
        terminal = "force_close"

        [strategy]
        rsi_window = 14
        rsi_lower_threshold = 40
        rsi_upper_threshold = 60
        "#,
    )
    .unwrap();
    assert_eq!(config.backtest.terminal, TerminalPolicy::ForceClose);

    // WHEN the backtest runs
    let result = run_backtest(&config, &synthetic_prices(600)).unwrap();

    // THEN no position survives the last bar
    assert!(result.open_positions.is_empty());
    assert!(result.trade_tally.total() > 0);
}

#[test]
fn bdd_scenario_precomputed_bars_from_csv() {
    // GIVEN a CSV that already carries the RSI signal columns
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bars.csv");
    std::fs::write(
        &path,
        "timestamp,close,RSI_BUY,RSI_SELL\n\
         2024-01-02 09:30:00,100,1,0\n\
         2024-01-02 09:35:00,94,0,0\n",
    )
    .unwrap();
    let config =
        BacktestConfig::from_toml_str("[backtest]\naggregation = \"single_indicator\"").unwrap();

    // WHEN the bars are loaded and simulated
    let bars = load_bars(&path).unwrap();
    let result = run_backtest_precomputed(&config, &bars).unwrap();

    // THEN the long opened at 100 is stopped out at 94 as a loss
    assert_eq!(result.trade_tally.losses, 1);
    assert_eq!(result.trade_tally.wins, 0);
    assert!((result.equity_curve[1] - 999_875.0).abs() < 1e-6);
}

#[test]
fn bdd_scenario_precomputed_bars_missing_signal_rejected() {
    // GIVEN bars with only RSI columns
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bars.csv");
    std::fs::write(&path, "date,close,RSI_BUY,RSI_SELL\n2024-01-02,100,1,0\n").unwrap();
    let bars = load_bars(&path).unwrap();

    // WHEN they run under the default majority vote
    let err = run_backtest_precomputed(&BacktestConfig::default(), &bars).unwrap_err();

    // THEN the engine reports malformed input before simulating
    assert!(matches!(err, RunError::Simulation(_)));
}

#[test]
fn bdd_scenario_artifacts_round_trip() {
    // GIVEN a completed backtest
    let result = run_backtest(&BacktestConfig::default(), &synthetic_prices(400)).unwrap();

    // WHEN its artifacts are saved and the result reloaded
    let dir = tempfile::tempdir().unwrap();
    save_run_artifacts(&result, dir.path()).unwrap();
    let loaded = load_run_artifacts(dir.path()).unwrap();

    // THEN the reloaded result describes the same run
    assert_eq!(loaded.params, result.params);
    assert_eq!(loaded.trade_tally, result.trade_tally);
    assert_eq!(loaded.equity_curve.len(), result.equity_curve.len());
}

#[test]
fn bdd_scenario_search_finds_best_over_trials() {
    // GIVEN a small random search maximizing final value
    let config = BacktestConfig::from_toml_str(
        r#"
        [search]
        n_trials = 8
        seed = 7
        objective = "final_value"

        [search.sampler]
        type = "random"
        "#,
    )
    .unwrap();
    assert_eq!(config.search.objective, Objective::FinalValue);
    let prices = synthetic_prices(600);

    // WHEN the search runs
    let outcome = run_search(&config, &prices, None).unwrap();

    // THEN every trial is recorded and the best is the maximum score
    assert_eq!(outcome.trials.len(), 8);
    assert!(!outcome.cancelled);
    let best = outcome.best.as_ref().unwrap();
    let max = outcome
        .trials
        .iter()
        .map(|t| t.score)
        .fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(best.score, max);

    // AND the history can be written out
    let dir = tempfile::tempdir().unwrap();
    let path = save_search_artifacts(&outcome, dir.path()).unwrap();
    assert!(path.exists());
}

#[test]
fn bdd_scenario_search_is_reproducible_for_a_seed() {
    // GIVEN the default local-search config with a short budget
    let config = BacktestConfig::from_toml_str("[search]\nn_trials = 12\nparallelism = 2").unwrap();
    let prices = synthetic_prices(500);

    // WHEN the search runs twice
    let a = run_search(&config, &prices, None).unwrap();
    let b = run_search(&config, &prices, None).unwrap();

    // THEN both runs propose and score identically
    assert_eq!(a.trials, b.trials);
    assert_eq!(a.best, b.best);
}

#[test]
fn bdd_scenario_failed_trials_do_not_abort_search() {
    // GIVEN prices too short for the largest RSI windows in the space
    let config = BacktestConfig::from_toml_str("[search]\nn_trials = 10\nseed = 3").unwrap();
    let prices = synthetic_prices(60);

    // WHEN the search runs
    let outcome = run_search(&config, &prices, None).unwrap();

    // THEN every trial is recorded, failures with -inf
    assert_eq!(outcome.trials.len(), 10);
    for trial in &outcome.trials {
        if trial.is_failure() {
            assert_eq!(trial.score, f64::NEG_INFINITY);
        }
    }
}

#[test]
fn bdd_scenario_cancelled_search_returns_empty_history() {
    // GIVEN a cancel flag raised before the search starts
    let flag = Arc::new(AtomicBool::new(true));

    // WHEN the search runs
    let outcome = run_search(
        &BacktestConfig::default(),
        &synthetic_prices(300),
        Some(Arc::clone(&flag)),
    )
    .unwrap();

    // THEN no trial ran and the outcome says so
    assert!(flag.load(Ordering::Relaxed));
    assert!(outcome.cancelled);
    assert!(outcome.trials.is_empty());
    assert!(outcome.best.is_none());
}
