//! Bar-by-bar simulation loop.
//!
//! Four phases per bar, always in this order:
//! 1. Close: stop-loss then take-profit, long side then short side
//! 2. Aggregate: buy/sell scores from the bar's signals
//! 3. Open: long on a buy trigger, then short on a sell trigger. A side
//!    closed in phase 1 stays flat until the next bar.
//! 4. Valuation: append mark-to-market equity
//!
//! Bars are processed strictly in sequence. The close decision at bar t+1
//! reads the ledger left by bar t, so there is no parallelism inside a run.

use log::{debug, trace};

use crate::domain::{Bar, ExitReason, StrategyParameters};
use crate::ledger::{BarStamp, EntryTerms, LedgerError};

use super::state::{EngineConfig, EngineState, SimulationResult, TerminalPolicy};
use super::validate::{validate_bars, SimulationError};

/// Run a full simulation over `bars`.
///
/// Input is validated up front; a malformed feed or invalid parameters are
/// rejected before any bar is processed.
pub fn run_simulation(
    bars: &[Bar],
    params: &StrategyParameters,
    config: &EngineConfig,
) -> Result<SimulationResult, SimulationError> {
    if !config.initial_capital.is_finite() || config.initial_capital <= 0.0 {
        return Err(SimulationError::InitialCapital(config.initial_capital));
    }
    params.validate()?;
    validate_bars(bars, config.aggregation)?;

    let mut sim = Simulation::new(params, config, bars.len());
    let last = bars.len() - 1;
    for (index, bar) in bars.iter().enumerate() {
        sim.process_bar(index, bar, index == last);
    }
    Ok(sim.finish())
}

/// Sides closed by a bar's close phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ClosedSides {
    long: bool,
    short: bool,
}

/// A simulation in progress.
///
/// Owns its `EngineState`; nothing outlives the run except the returned
/// `SimulationResult`.
pub struct Simulation<'a> {
    params: &'a StrategyParameters,
    config: &'a EngineConfig,
    terms: EntryTerms,
    state: EngineState,
}

impl<'a> Simulation<'a> {
    pub fn new(params: &'a StrategyParameters, config: &'a EngineConfig, expected_bars: usize) -> Self {
        Self {
            params,
            config,
            terms: EntryTerms::from(params),
            state: EngineState::new(config.initial_capital, expected_bars),
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Process one bar. `is_last` enables terminal liquidation.
    pub fn process_bar(&mut self, index: usize, bar: &Bar, is_last: bool) {
        let at = BarStamp {
            index,
            ts: bar.timestamp,
        };
        let price = bar.close;

        // ─── Phase 1: Close ───
        let closed = self.close_phase(at, price);

        // ─── Phase 2: Aggregate ───
        let policy = self.config.aggregation;
        let scores = policy.scores(&bar.signals);

        // ─── Phase 3: Open ───
        if policy.buy_triggered(scores) && !closed.long && self.state.ledger.long().is_none() {
            let result = self.state.ledger.open_long(at, price, &self.terms);
            self.note_entry("long", index, price, result);
        }
        if policy.sell_triggered(scores) && !closed.short && self.state.ledger.short().is_none() {
            let result = self.state.ledger.open_short(at, price, &self.terms);
            self.note_entry("short", index, price, result);
        }

        if is_last && self.config.terminal == TerminalPolicy::ForceClose {
            self.liquidate(at, price);
        }

        // ─── Phase 4: Valuation ───
        let equity = self.state.ledger.mark_to_market(price);
        self.state.equity_curve.push(equity);
    }

    fn close_phase(&mut self, at: BarStamp, price: f64) -> ClosedSides {
        let commission = self.params.commission_rate;
        let mut closed = ClosedSides::default();

        let long_exit = self.state.ledger.long().and_then(|pos| {
            if pos.stop_breached(price) {
                Some(ExitReason::StopLoss)
            } else if pos.target_reached(price) {
                Some(ExitReason::TakeProfit)
            } else {
                None
            }
        });
        if let Some(reason) = long_exit {
            if let Some(trade) = self.state.ledger.close_long(at, price, commission, reason) {
                trace!("bar {}: closed long at {price} ({reason:?})", at.index);
                self.state.record_trade(trade);
                closed.long = true;
            }
        }

        let short_exit = self.state.ledger.short().and_then(|pos| {
            if pos.stop_breached(price) {
                Some(ExitReason::StopLoss)
            } else if pos.target_reached(price) {
                Some(ExitReason::TakeProfit)
            } else {
                None
            }
        });
        if let Some(reason) = short_exit {
            if let Some(trade) = self.state.ledger.close_short(at, price, commission, reason) {
                trace!("bar {}: closed short at {price} ({reason:?})", at.index);
                self.state.record_trade(trade);
                closed.short = true;
            }
        }
        closed
    }

    fn liquidate(&mut self, at: BarStamp, price: f64) {
        let commission = self.params.commission_rate;
        if let Some(trade) =
            self.state
                .ledger
                .close_long(at, price, commission, ExitReason::EndOfData)
        {
            self.state.record_trade(trade);
        }
        if let Some(trade) =
            self.state
                .ledger
                .close_short(at, price, commission, ExitReason::EndOfData)
        {
            self.state.record_trade(trade);
        }
    }

    fn note_entry(&mut self, side: &str, index: usize, price: f64, result: Result<(), LedgerError>) {
        match result {
            Ok(()) => trace!("bar {index}: opened {side} at {price}"),
            Err(err) => {
                // Not enough cash is a normal "no trade" outcome.
                trace!("bar {index}: {side} entry skipped: {err}");
                self.state.skipped_entries += 1;
            }
        }
    }

    pub fn finish(self) -> SimulationResult {
        let state = self.state;
        let bar_count = state.equity_curve.len() - 1;
        debug!(
            "simulation finished: {bar_count} bars, {} wins / {} losses, final equity {:.2}",
            state.tally.wins,
            state.tally.losses,
            state.equity_curve.last().copied().unwrap_or(0.0)
        );
        SimulationResult {
            open_positions: state.ledger.open_positions(),
            final_cash: state.ledger.cash(),
            commission_paid: state.ledger.commission_paid(),
            skipped_entries: state.skipped_entries,
            bar_count,
            equity_curve: state.equity_curve,
            tally: state.tally,
            trades: state.trades,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SignalName, SignalSet, TradeOutcome};
    use crate::engine::aggregation::AggregationPolicy;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
            + chrono::Duration::minutes(5 * i as i64)
    }

    /// Bars for single-indicator mode: (close, rsi_buy, rsi_sell).
    fn rsi_bars(spec: &[(f64, bool, bool)]) -> Vec<Bar> {
        spec.iter()
            .enumerate()
            .map(|(i, &(close, buy, sell))| {
                Bar::new(
                    ts(i),
                    close,
                    SignalSet::from_pairs([(SignalName::RsiBuy, buy), (SignalName::RsiSell, sell)]),
                )
            })
            .collect()
    }

    fn single_config() -> EngineConfig {
        EngineConfig::new(1_000_000.0).with_aggregation(AggregationPolicy::SingleIndicator)
    }

    #[test]
    fn one_bar_long_entry_matches_ledger_arithmetic() {
        let bars = rsi_bars(&[(100.0, true, false)]);
        let params = StrategyParameters {
            shares_per_trade: 1_000,
            commission_rate: 0.00125,
            ..Default::default()
        };
        let result = run_simulation(&bars, &params, &single_config()).unwrap();

        assert_eq!(result.equity_curve.len(), 2);
        assert_eq!(result.equity_curve[0], 1_000_000.0);
        assert!((result.final_cash - 899_875.0).abs() < 1e-6);
        assert!((result.equity_curve[1] - 999_875.0).abs() < 1e-6);
        assert_eq!(result.open_positions.len(), 1);
    }

    #[test]
    fn stop_loss_closes_first_bar_below_level() {
        let bars = rsi_bars(&[
            (100.0, true, false),
            (96.0, false, false),
            (95.0, false, false),
            (94.9, false, false),
            (90.0, false, false),
        ]);
        let params = StrategyParameters {
            shares_per_trade: 10,
            stop_loss_fraction: 0.05,
            ..Default::default()
        };
        let result = run_simulation(&bars, &params, &single_config()).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.exit_bar, 3);
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.outcome, TradeOutcome::Loss);
        assert_eq!(result.tally.losses, 1);
        assert_eq!(result.tally.wins, 0);
    }

    #[test]
    fn closed_side_stays_flat_until_next_bar() {
        let bars = rsi_bars(&[
            (100.0, true, false),
            (110.0, true, false),
            (111.0, true, false),
        ]);
        let params = StrategyParameters {
            shares_per_trade: 10,
            take_profit_fraction: 0.05,
            ..Default::default()
        };
        let result = run_simulation(&bars, &params, &single_config()).unwrap();

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].exit_bar, 1);
        assert_eq!(result.tally.wins, 1);
        // bar 1 closed the long, so the buy on bar 1 is ignored; bar 2 reopens
        assert_eq!(result.open_positions.len(), 1);
        assert_eq!(result.open_positions[0].opened_at(), 111.0);
        assert_eq!(result.skipped_entries, 0);
    }

    #[test]
    fn entry_after_short_loss_with_negative_cash_is_skipped() {
        let bars = rsi_bars(&[(100.0, false, true), (200.0, true, false)]);
        let params = StrategyParameters {
            shares_per_trade: 1_000,
            commission_rate: 0.0,
            ..Default::default()
        };
        let config = EngineConfig::new(10_000.0).with_aggregation(AggregationPolicy::SingleIndicator);
        let result = run_simulation(&bars, &params, &config).unwrap();

        // short stopped out at 200: cash 10_000 - 100_000
        assert_eq!(result.tally.losses, 1);
        assert!((result.final_cash + 90_000.0).abs() < 1e-6);
        assert!(result.open_positions.is_empty());
        assert_eq!(result.skipped_entries, 1);
        assert_eq!(result.equity_curve.len(), 3);
    }

    #[test]
    fn short_take_profit_is_a_win() {
        let bars = rsi_bars(&[(100.0, false, true), (94.0, false, false)]);
        let params = StrategyParameters {
            shares_per_trade: 100,
            commission_rate: 0.0,
            take_profit_fraction: 0.05,
            ..Default::default()
        };
        let result = run_simulation(&bars, &params, &single_config()).unwrap();

        assert_eq!(result.tally.wins, 1);
        assert_eq!(result.trades[0].exit_reason, ExitReason::TakeProfit);
        assert!((result.final_equity() - 1_000_600.0).abs() < 1e-6);
    }

    #[test]
    fn insufficient_capital_is_skipped_silently() {
        let bars = rsi_bars(&[(100.0, true, false), (100.0, true, false)]);
        let params = StrategyParameters {
            shares_per_trade: 100_000,
            ..Default::default()
        };
        let result = run_simulation(&bars, &params, &single_config()).unwrap();

        assert!(result.open_positions.is_empty());
        assert_eq!(result.skipped_entries, 2);
        assert_eq!(result.equity_curve, vec![1_000_000.0; 3]);
    }

    #[test]
    fn force_close_liquidates_at_last_bar() {
        let bars = rsi_bars(&[(100.0, true, false), (102.0, false, false)]);
        let params = StrategyParameters {
            shares_per_trade: 10,
            commission_rate: 0.0,
            ..Default::default()
        };
        let held = run_simulation(&bars, &params, &single_config()).unwrap();
        let closed = run_simulation(
            &bars,
            &params,
            &single_config().with_terminal(TerminalPolicy::ForceClose),
        )
        .unwrap();

        assert_eq!(held.tally.total(), 0);
        assert_eq!(held.open_positions.len(), 1);

        assert!(closed.open_positions.is_empty());
        assert_eq!(closed.trades.len(), 1);
        assert_eq!(closed.trades[0].exit_reason, ExitReason::EndOfData);
        // below take-profit, so the forced close counts as a loss
        assert_eq!(closed.tally.losses, 1);
        // without commission both policies value the book identically
        assert!((held.final_equity() - closed.final_equity()).abs() < 1e-9);
    }

    #[test]
    fn invalid_capital_rejected() {
        let bars = rsi_bars(&[(100.0, false, false)]);
        let err = run_simulation(
            &bars,
            &StrategyParameters::default(),
            &EngineConfig::new(0.0).with_aggregation(AggregationPolicy::SingleIndicator),
        )
        .unwrap_err();
        assert_eq!(err, SimulationError::InitialCapital(0.0));
    }
}
