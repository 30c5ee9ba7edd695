//! Engine configuration, per-run mutable state, and the simulation result.

use serde::{Deserialize, Serialize};

use crate::domain::{Position, TradeRecord, TradeTally};
use crate::ledger::Ledger;

use super::aggregation::AggregationPolicy;

/// What happens to positions still open after the last bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalPolicy {
    /// Leave them open; the final equity point is mark-to-market.
    #[default]
    MarkToMarket,
    /// Liquidate at the last close and count the closes in the tally.
    ForceClose,
}

/// Configuration for a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub initial_capital: f64,
    pub aggregation: AggregationPolicy,
    pub terminal: TerminalPolicy,
}

impl EngineConfig {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            aggregation: AggregationPolicy::default(),
            terminal: TerminalPolicy::default(),
        }
    }

    pub fn with_aggregation(mut self, aggregation: AggregationPolicy) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_terminal(mut self, terminal: TerminalPolicy) -> Self {
        self.terminal = terminal;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(1_000_000.0)
    }
}

/// State that evolves bar-by-bar. One instance per run, never shared.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub ledger: Ledger,
    pub equity_curve: Vec<f64>,
    pub tally: TradeTally,
    pub trades: Vec<TradeRecord>,
    /// Entries skipped because the ledger lacked cash.
    pub skipped_entries: usize,
}

impl EngineState {
    /// Fresh state with the equity curve seeded at `initial_capital`.
    pub fn new(initial_capital: f64, expected_bars: usize) -> Self {
        let mut equity_curve = Vec::with_capacity(expected_bars + 1);
        equity_curve.push(initial_capital);
        Self {
            ledger: Ledger::new(initial_capital),
            equity_curve,
            tally: TradeTally::default(),
            trades: Vec::new(),
            skipped_entries: 0,
        }
    }

    pub fn record_trade(&mut self, trade: TradeRecord) {
        self.tally.record(trade.outcome);
        self.trades.push(trade);
    }
}

/// Output of a complete simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Portfolio value before the first bar and after each bar (`bars + 1` points).
    pub equity_curve: Vec<f64>,
    pub tally: TradeTally,
    pub trades: Vec<TradeRecord>,
    /// Positions left open at the end (empty under `ForceClose`).
    pub open_positions: Vec<Position>,
    pub final_cash: f64,
    pub commission_paid: f64,
    pub skipped_entries: usize,
    pub bar_count: usize,
}

impl SimulationResult {
    pub fn final_equity(&self) -> f64 {
        self.equity_curve.last().copied().unwrap_or(0.0)
    }

    pub fn initial_equity(&self) -> f64 {
        self.equity_curve.first().copied().unwrap_or(0.0)
    }
}
