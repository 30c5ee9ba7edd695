//! Closed trades and the win/loss tally.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::position::PositionSide;

/// Classification of a closed position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeOutcome {
    Win,
    Loss,
}

/// Why the engine closed a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    /// Liquidated at the last bar under `TerminalPolicy::ForceClose`.
    EndOfData,
}

/// A completed round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub side: PositionSide,
    pub entry_bar: usize,
    pub entry_ts: NaiveDateTime,
    pub entry_price: f64,
    pub exit_bar: usize,
    pub exit_ts: NaiveDateTime,
    pub exit_price: f64,
    pub shares: u64,
    /// Cash result of the round-trip after entry and exit commissions.
    pub net_pnl: f64,
    pub outcome: TradeOutcome,
    pub exit_reason: ExitReason,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.outcome == TradeOutcome::Win
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }
}

/// Win/loss counts, incremented exactly once per close.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeTally {
    pub wins: u64,
    pub losses: u64,
}

impl TradeTally {
    pub fn record(&mut self, outcome: TradeOutcome) {
        match outcome {
            TradeOutcome::Win => self.wins += 1,
            TradeOutcome::Loss => self.losses += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.wins + self.losses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_each_outcome_once() {
        let mut tally = TradeTally::default();
        tally.record(TradeOutcome::Win);
        tally.record(TradeOutcome::Loss);
        tally.record(TradeOutcome::Loss);
        assert_eq!(tally.wins, 1);
        assert_eq!(tally.losses, 2);
        assert_eq!(tally.total(), 3);
    }
}
