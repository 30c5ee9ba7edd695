//! Export: JSON, CSV, and Markdown artifacts for runs and searches.
//!
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade log and equity curve for external analysis tools
//! - **Markdown**: a human-readable single-run report
//!
//! Persisted run results carry a `schema_version`; newer versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use signalbt_core::domain::TradeRecord;

use crate::runner::{RunResult, SCHEMA_VERSION};
use crate::search::SearchOutcome;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `RunResult` to pretty JSON.
pub fn export_json(result: &RunResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize RunResult to JSON")
}

/// Deserialize a `RunResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunResult> {
    let result: RunResult =
        serde_json::from_str(json).context("failed to deserialize RunResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

/// Serialize a search outcome (best result and full trial history).
///
/// Failed trials are written with `"score": null`.
pub fn export_search_json(outcome: &SearchOutcome) -> Result<String> {
    serde_json::to_string_pretty(outcome).context("failed to serialize SearchOutcome to JSON")
}

/// Deserialize a search outcome; a `null` score reads back as `-inf`.
pub fn import_search_json(json: &str) -> Result<SearchOutcome> {
    serde_json::from_str(json).context("failed to deserialize SearchOutcome from JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the trade log as CSV, one row per closed position.
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "side",
        "entry_bar",
        "entry_time",
        "entry_price",
        "exit_bar",
        "exit_time",
        "exit_price",
        "shares",
        "net_pnl",
        "outcome",
        "exit_reason",
        "bars_held",
    ])?;

    for t in trades {
        wtr.write_record([
            &format!("{:?}", t.side),
            &t.entry_bar.to_string(),
            &t.entry_ts.to_string(),
            &format!("{:.6}", t.entry_price),
            &t.exit_bar.to_string(),
            &t.exit_ts.to_string(),
            &format!("{:.6}", t.exit_price),
            &t.shares.to_string(),
            &format!("{:.2}", t.net_pnl),
            &format!("{:?}", t.outcome),
            &format!("{:?}", t.exit_reason),
            &t.bars_held().to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export an equity curve as CSV. Point 0 is the starting capital.
pub fn export_equity_csv(equity_curve: &[f64]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["point", "equity"])?;
    for (i, eq) in equity_curve.iter().enumerate() {
        wtr.write_record([&i.to_string(), &format!("{:.2}", eq)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundles ───────────────────────────────────────────────

/// Write the artifact set for a single run into `output_dir`:
/// - `result.json`: the full `RunResult`
/// - `trades.csv`: trade log
/// - `equity.csv`: equity curve
/// - `report.md`: Markdown summary
pub fn save_run_artifacts(result: &RunResult, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    write_file(output_dir, "result.json", &export_json(result)?)?;
    write_file(output_dir, "trades.csv", &export_trades_csv(&result.trades)?)?;
    write_file(output_dir, "equity.csv", &export_equity_csv(&result.equity_curve)?)?;
    write_file(output_dir, "report.md", &generate_report(result))?;

    Ok(output_dir.to_path_buf())
}

/// Write `search.json` (best result plus trial history) into `output_dir`.
pub fn save_search_artifacts(outcome: &SearchOutcome, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;
    let path = write_file(output_dir, "search.json", &export_search_json(outcome)?)?;
    Ok(path)
}

/// Load a `SearchOutcome` from a directory written by `save_search_artifacts`.
pub fn load_search_artifacts(dir: &Path) -> Result<SearchOutcome> {
    let path = dir.join("search.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_search_json(&json)
}

/// Load a `RunResult` from a directory written by `save_run_artifacts`.
pub fn load_run_artifacts(dir: &Path) -> Result<RunResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

fn write_file(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown report for a single run.
pub fn generate_report(result: &RunResult) -> String {
    let mut md = String::with_capacity(1024);
    let p = &result.params;
    let m = &result.metrics;

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Parameters\n\n");
    md.push_str("| Parameter | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Initial Capital | {:.2} |\n", result.initial_capital));
    md.push_str(&format!("| RSI Window | {} |\n", p.rsi_window));
    md.push_str(&format!(
        "| RSI Thresholds | {} / {} |\n",
        p.rsi_lower_threshold, p.rsi_upper_threshold
    ));
    md.push_str(&format!(
        "| Stop / Target | {:.2}% / {:.2}% |\n",
        p.stop_loss_fraction * 100.0,
        p.take_profit_fraction * 100.0
    ));
    md.push_str(&format!("| Shares per Trade | {} |\n", p.shares_per_trade));
    md.push_str(&format!("| Commission | {:.4}% |\n", p.commission_rate * 100.0));
    md.push_str(&format!("| Bars | {} |\n", result.bar_count));
    md.push('\n');

    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Final Value | {:.2} |\n", m.final_value));
    md.push_str(&format!("| Total Return | {:.2}% |\n", m.total_return * 100.0));
    md.push_str(&format!("| Sharpe | {:.3} |\n", m.sharpe));
    md.push_str(&format!("| Sortino | {:.3} |\n", m.sortino));
    md.push_str(&format!("| Calmar | {:.3} |\n", m.calmar));
    md.push_str(&format!("| Max Drawdown | {:.4} |\n", m.max_drawdown));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate));
    md.push_str(&format!(
        "| Trades | {} ({} wins, {} losses) |\n",
        m.trade_count, m.wins, m.losses
    ));
    md.push_str(&format!("| Commission Paid | {:.2} |\n", result.commission_paid));
    md.push_str(&format!("| Skipped Entries | {} |\n", result.skipped_entries));
    md.push_str(&format!("| Open at End | {} |\n", result.open_positions.len()));
    md.push('\n');

    md
}
