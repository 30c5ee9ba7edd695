//! Position ledger: cash plus at most one open long and one open short.
//!
//! The ledger is an owned value created fresh for every simulation run.
//! It never reads a bar; the engine decides *when* to open and close and the
//! ledger does the cash arithmetic.
//!
//! Cash flows:
//! - long entry debits `price * shares * (1 + commission)`
//! - long exit credits `price * shares * (1 - commission)`
//! - short entry debits only `price * shares * commission`
//! - short exit credits `(entry_amount - price * shares) - price * shares * commission`

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    ExitReason, LongPosition, Position, PositionSide, ShortPosition, StrategyParameters,
    TradeOutcome, TradeRecord,
};

/// Errors from ledger operations.
///
/// Neither is fatal to a run: the engine treats both as "no trade".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("insufficient capital: need more than {required:.2}, have {available:.2}")]
    InsufficientCapital { required: f64, available: f64 },
    #[error("a {0:?} position is already open")]
    SideOccupied(PositionSide),
}

/// Where in the bar sequence an operation happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarStamp {
    pub index: usize,
    pub ts: NaiveDateTime,
}

/// Risk and cost terms applied to a new position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryTerms {
    pub shares: u64,
    pub stop_loss_fraction: f64,
    pub take_profit_fraction: f64,
    pub commission_rate: f64,
}

impl From<&StrategyParameters> for EntryTerms {
    fn from(params: &StrategyParameters) -> Self {
        Self {
            shares: params.shares_per_trade,
            stop_loss_fraction: params.stop_loss_fraction,
            take_profit_fraction: params.take_profit_fraction,
            commission_rate: params.commission_rate,
        }
    }
}

/// Cash and open positions for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    cash: f64,
    long: Option<LongPosition>,
    short: Option<ShortPosition>,
    commission_paid: f64,
}

impl Ledger {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            long: None,
            short: None,
            commission_paid: 0.0,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn commission_paid(&self) -> f64 {
        self.commission_paid
    }

    pub fn long(&self) -> Option<&LongPosition> {
        self.long.as_ref()
    }

    pub fn short(&self) -> Option<&ShortPosition> {
        self.short.as_ref()
    }

    /// Open positions, long first.
    pub fn open_positions(&self) -> Vec<Position> {
        self.long
            .iter()
            .cloned()
            .map(Position::Long)
            .chain(self.short.iter().cloned().map(Position::Short))
            .collect()
    }

    /// Buy `terms.shares` at `price`.
    ///
    /// Requires cash strictly greater than the full cost including commission,
    /// so a successful entry never leaves cash negative.
    pub fn open_long(
        &mut self,
        at: BarStamp,
        price: f64,
        terms: &EntryTerms,
    ) -> Result<(), LedgerError> {
        if self.long.is_some() {
            return Err(LedgerError::SideOccupied(PositionSide::Long));
        }
        let notional = price * terms.shares as f64;
        let cost = notional * (1.0 + terms.commission_rate);
        if self.cash <= cost {
            return Err(LedgerError::InsufficientCapital {
                required: cost,
                available: self.cash,
            });
        }

        let commission = notional * terms.commission_rate;
        self.cash -= cost;
        self.commission_paid += commission;
        self.long = Some(LongPosition {
            opened_at: price,
            opened_bar: at.index,
            opened_ts: at.ts,
            shares: terms.shares,
            entry_commission: commission,
            stop_loss: price * (1.0 - terms.stop_loss_fraction),
            take_profit: price * (1.0 + terms.take_profit_fraction),
        });
        Ok(())
    }

    /// Sell `terms.shares` short at `price`.
    ///
    /// Only the commission leaves the account at entry; the sale notional is
    /// remembered as `entry_amount` and settled at exit.
    pub fn open_short(
        &mut self,
        at: BarStamp,
        price: f64,
        terms: &EntryTerms,
    ) -> Result<(), LedgerError> {
        if self.short.is_some() {
            return Err(LedgerError::SideOccupied(PositionSide::Short));
        }
        let entry_amount = price * terms.shares as f64;
        let commission = entry_amount * terms.commission_rate;
        if self.cash <= commission {
            return Err(LedgerError::InsufficientCapital {
                required: commission,
                available: self.cash,
            });
        }

        self.cash -= commission;
        self.commission_paid += commission;
        self.short = Some(ShortPosition {
            opened_at: price,
            opened_bar: at.index,
            opened_ts: at.ts,
            shares: terms.shares,
            entry_amount,
            entry_commission: commission,
            stop_loss: price * (1.0 + terms.stop_loss_fraction),
            take_profit: price * (1.0 - terms.take_profit_fraction),
        });
        Ok(())
    }

    /// Sell the open long at `price`. Returns `None` if no long is open.
    ///
    /// The outcome is a win only when `price` is above the take-profit level.
    pub fn close_long(
        &mut self,
        at: BarStamp,
        price: f64,
        commission_rate: f64,
        reason: ExitReason,
    ) -> Option<TradeRecord> {
        let pos = self.long.take()?;
        let notional = price * pos.shares as f64;
        let commission = notional * commission_rate;
        let proceeds = notional - commission;
        self.cash += proceeds;
        self.commission_paid += commission;

        let outcome = if price > pos.take_profit {
            TradeOutcome::Win
        } else {
            TradeOutcome::Loss
        };
        let entry_cost = pos.opened_at * pos.shares as f64 + pos.entry_commission;

        Some(TradeRecord {
            side: PositionSide::Long,
            entry_bar: pos.opened_bar,
            entry_ts: pos.opened_ts,
            entry_price: pos.opened_at,
            exit_bar: at.index,
            exit_ts: at.ts,
            exit_price: price,
            shares: pos.shares,
            net_pnl: proceeds - entry_cost,
            outcome,
            exit_reason: reason,
        })
    }

    /// Buy back the open short at `price`. Returns `None` if no short is open.
    ///
    /// The outcome is a win when `price` fell to or through the take-profit level.
    pub fn close_short(
        &mut self,
        at: BarStamp,
        price: f64,
        commission_rate: f64,
        reason: ExitReason,
    ) -> Option<TradeRecord> {
        let pos = self.short.take()?;
        let exit_amount = price * pos.shares as f64;
        let commission = exit_amount * commission_rate;
        let settlement = (pos.entry_amount - exit_amount) - commission;
        self.cash += settlement;
        self.commission_paid += commission;

        let outcome = if price <= pos.take_profit {
            TradeOutcome::Win
        } else {
            TradeOutcome::Loss
        };

        Some(TradeRecord {
            side: PositionSide::Short,
            entry_bar: pos.opened_bar,
            entry_ts: pos.opened_ts,
            entry_price: pos.opened_at,
            exit_bar: at.index,
            exit_ts: at.ts,
            exit_price: price,
            shares: pos.shares,
            net_pnl: settlement - pos.entry_commission,
            outcome,
            exit_reason: reason,
        })
    }

    /// Cash plus the value of every open position at `price`. No side effects.
    pub fn mark_to_market(&self, price: f64) -> f64 {
        let long_value = self.long.as_ref().map_or(0.0, |p| p.market_value(price));
        let short_value = self.short.as_ref().map_or(0.0, |p| p.market_value(price));
        self.cash + long_value + short_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stamp(index: usize) -> BarStamp {
        BarStamp {
            index,
            ts: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap()
                + chrono::Duration::minutes(5 * index as i64),
        }
    }

    fn terms(shares: u64, commission_rate: f64) -> EntryTerms {
        EntryTerms {
            shares,
            stop_loss_fraction: 0.05,
            take_profit_fraction: 0.05,
            commission_rate,
        }
    }

    #[test]
    fn open_long_debits_cost_and_sets_levels() {
        let mut ledger = Ledger::new(1_000_000.0);
        ledger
            .open_long(stamp(0), 100.0, &terms(1_000, 0.00125))
            .unwrap();

        assert!((ledger.cash() - 899_875.0).abs() < 1e-6);
        let long = ledger.long().unwrap();
        assert_eq!(long.stop_loss, 95.0);
        assert_eq!(long.take_profit, 105.0);
        assert!((ledger.mark_to_market(100.0) - 999_875.0).abs() < 1e-6);
    }

    #[test]
    fn open_long_requires_strictly_more_cash_than_cost() {
        let mut ledger = Ledger::new(1_000.0);
        let err = ledger.open_long(stamp(0), 100.0, &terms(10, 0.0)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientCapital { .. }));
        assert_eq!(ledger.cash(), 1_000.0);
        assert!(ledger.long().is_none());
    }

    #[test]
    fn open_short_debits_only_commission() {
        let mut ledger = Ledger::new(10_000.0);
        ledger.open_short(stamp(0), 50.0, &terms(100, 0.01)).unwrap();

        assert!((ledger.cash() - 9_950.0).abs() < 1e-9);
        let short = ledger.short().unwrap();
        assert_eq!(short.entry_amount, 5_000.0);
        assert!((short.stop_loss - 52.5).abs() < 1e-9);
        assert!((short.take_profit - 47.5).abs() < 1e-9);
    }

    #[test]
    fn second_entry_on_same_side_is_rejected() {
        let mut ledger = Ledger::new(100_000.0);
        ledger.open_long(stamp(0), 10.0, &terms(10, 0.0)).unwrap();
        let cash = ledger.cash();
        let err = ledger.open_long(stamp(1), 11.0, &terms(10, 0.0)).unwrap_err();
        assert_eq!(err, LedgerError::SideOccupied(PositionSide::Long));
        assert_eq!(ledger.cash(), cash);
        assert_eq!(ledger.long().unwrap().opened_at, 10.0);
    }

    #[test]
    fn close_long_credits_proceeds_and_classifies() {
        let mut ledger = Ledger::new(10_000.0);
        ledger.open_long(stamp(0), 100.0, &terms(10, 0.0)).unwrap();
        let trade = ledger
            .close_long(stamp(3), 110.0, 0.0, ExitReason::TakeProfit)
            .unwrap();

        assert_eq!(trade.outcome, TradeOutcome::Win);
        assert!((trade.net_pnl - 100.0).abs() < 1e-9);
        assert_eq!(trade.bars_held(), 3);
        assert!((ledger.cash() - 10_100.0).abs() < 1e-9);
        assert!(ledger.long().is_none());
    }

    #[test]
    fn close_long_below_target_is_a_loss() {
        let mut ledger = Ledger::new(10_000.0);
        ledger.open_long(stamp(0), 100.0, &terms(10, 0.0)).unwrap();
        let trade = ledger
            .close_long(stamp(1), 94.0, 0.0, ExitReason::StopLoss)
            .unwrap();
        assert_eq!(trade.outcome, TradeOutcome::Loss);
        assert!((trade.net_pnl + 60.0).abs() < 1e-9);
    }

    #[test]
    fn close_short_settles_difference() {
        let mut ledger = Ledger::new(10_000.0);
        ledger.open_short(stamp(0), 100.0, &terms(10, 0.0)).unwrap();
        let trade = ledger
            .close_short(stamp(2), 90.0, 0.0, ExitReason::TakeProfit)
            .unwrap();

        assert_eq!(trade.outcome, TradeOutcome::Win);
        assert!((ledger.cash() - 10_100.0).abs() < 1e-9);
        assert!((trade.net_pnl - 100.0).abs() < 1e-9);
    }

    #[test]
    fn close_short_net_pnl_includes_both_commissions() {
        let mut ledger = Ledger::new(10_000.0);
        ledger.open_short(stamp(0), 100.0, &terms(10, 0.01)).unwrap();
        let trade = ledger
            .close_short(stamp(1), 106.0, 0.01, ExitReason::StopLoss)
            .unwrap();

        // entry commission 10, exit commission 10.6, price move -60
        assert_eq!(trade.outcome, TradeOutcome::Loss);
        assert!((trade.net_pnl + 80.6).abs() < 1e-9);
        assert!((ledger.cash() - (10_000.0 - 80.6)).abs() < 1e-9);
        assert!((ledger.commission_paid() - 20.6).abs() < 1e-9);
    }

    #[test]
    fn closing_an_empty_side_returns_none() {
        let mut ledger = Ledger::new(1_000.0);
        assert!(ledger
            .close_long(stamp(0), 10.0, 0.0, ExitReason::StopLoss)
            .is_none());
        assert!(ledger
            .close_short(stamp(0), 10.0, 0.0, ExitReason::StopLoss)
            .is_none());
        assert_eq!(ledger.cash(), 1_000.0);
    }

    #[test]
    fn mark_to_market_with_both_sides() {
        let mut ledger = Ledger::new(100_000.0);
        ledger.open_long(stamp(0), 50.0, &terms(100, 0.0)).unwrap();
        ledger.open_short(stamp(0), 50.0, &terms(100, 0.0)).unwrap();
        // long and short offset each other exactly
        assert!((ledger.mark_to_market(60.0) - 100_000.0).abs() < 1e-9);
        assert_eq!(ledger.open_positions().len(), 2);
    }
}
