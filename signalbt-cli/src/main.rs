//! signalbt CLI: backtest and optimize commands.
//!
//! Commands:
//! - `run`: execute one backtest from a TOML config and a CSV file
//! - `optimize`: run the hyperparameter search and report the best parameters

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};

use signalbt_core::domain::StrategyParameters;
use signalbt_runner::export::{save_run_artifacts, save_search_artifacts};
use signalbt_runner::{
    load_bars, load_prices, run_backtest, run_backtest_precomputed, run_search, BacktestConfig,
    RunResult, SearchOutcome,
};

#[derive(Parser)]
#[command(
    name = "signalbt",
    about = "signalbt: bar-close long/short signal backtester"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a single backtest.
    Run {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// CSV with a timestamp column and a close column.
        #[arg(long)]
        data: PathBuf,

        /// The CSV already carries signal columns (RSI_BUY, ...); skip the indicator feed.
        #[arg(long, default_value_t = false)]
        precomputed: bool,

        /// Directory for result.json, trades.csv, equity.csv and report.md.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Search the parameter space for the best objective value.
    Optimize {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// CSV with a timestamp column and a close column.
        #[arg(long)]
        data: PathBuf,

        /// Override `[search] n_trials`.
        #[arg(long)]
        trials: Option<usize>,

        /// Override `[search] seed`.
        #[arg(long)]
        seed: Option<u64>,

        /// Directory for search.json.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            data,
            precomputed,
            output,
        } => run_backtest_cmd(config.as_deref(), &data, precomputed, output.as_deref()),
        Commands::Optimize {
            config,
            data,
            trials,
            seed,
            output,
        } => run_optimize_cmd(config.as_deref(), &data, trials, seed, output.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<BacktestConfig> {
    match path {
        Some(path) => BacktestConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(BacktestConfig::default()),
    }
}

fn run_backtest_cmd(
    config_path: Option<&Path>,
    data: &Path,
    precomputed: bool,
    output: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;
    info!("run id {}", config.run_id()?);

    let result = if precomputed {
        let bars =
            load_bars(data).with_context(|| format!("failed to load bars from {}", data.display()))?;
        run_backtest_precomputed(&config, &bars)?
    } else {
        let prices = load_prices(data)
            .with_context(|| format!("failed to load prices from {}", data.display()))?;
        run_backtest(&config, &prices)?
    };

    print_summary(&result);

    if let Some(dir) = output {
        let dir = save_run_artifacts(&result, dir)?;
        println!("Artifacts saved to: {}", dir.display());
    }
    Ok(())
}

fn run_optimize_cmd(
    config_path: Option<&Path>,
    data: &Path,
    trials: Option<usize>,
    seed: Option<u64>,
    output: Option<&Path>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(n) = trials {
        config.search.n_trials = n;
    }
    if let Some(s) = seed {
        config.search.seed = s;
    }
    info!("run id {}", config.run_id()?);

    let prices = load_prices(data)
        .with_context(|| format!("failed to load prices from {}", data.display()))?;
    let outcome = run_search(&config, &prices, None)?;

    print_search_summary(&outcome);

    if let Some(dir) = output {
        let path = save_search_artifacts(&outcome, dir)?;
        println!("Trial history saved to: {}", path.display());
    }
    Ok(())
}

fn print_params(params: &StrategyParameters) {
    println!("RSI Window:     {}", params.rsi_window);
    println!(
        "RSI Bounds:     {} / {}",
        params.rsi_lower_threshold, params.rsi_upper_threshold
    );
    println!(
        "Stop / Target:  {:.2}% / {:.2}%",
        params.stop_loss_fraction * 100.0,
        params.take_profit_fraction * 100.0
    );
    println!("Shares:         {}", params.shares_per_trade);
    println!("Commission:     {:.4}%", params.commission_rate * 100.0);
}

fn print_summary(result: &RunResult) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Bars:           {}", result.bar_count);
    println!("Initial:        {:.2}", result.initial_capital);
    print_params(&result.params);
    println!();
    println!("--- Performance ---");
    println!("Final Value:    {:.2}", m.final_value);
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe);
    println!("Sortino:        {:.3}", m.sortino);
    println!("Calmar:         {:.3}", m.calmar);
    println!("Max Drawdown:   {:.4}", m.max_drawdown);
    println!("Win Rate:       {:.1}%", m.win_rate);
    println!("Trades:         {} ({} W / {} L)", m.trade_count, m.wins, m.losses);
    println!("Open at End:    {}", result.open_positions.len());
    println!("Skipped:        {}", result.skipped_entries);
}

fn print_search_summary(outcome: &SearchOutcome) {
    println!();
    println!("=== Search Result ===");
    println!("Trials:         {}", outcome.trials.len());
    println!("Failed:         {}", outcome.failed_count());
    if outcome.cancelled {
        println!("Cancelled:      yes");
    }
    match &outcome.best {
        Some(best) => {
            println!("Best Trial:     {}", best.trial_index);
            println!("Best Score:     {:.6}", best.score);
            print_params(&best.params);
        }
        None => println!("No successful trial."),
    }
}
