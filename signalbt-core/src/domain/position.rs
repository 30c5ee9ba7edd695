//! Open positions, one record type per side.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

/// An open long position.
///
/// Cash for the shares was paid at entry, so the position is worth
/// `shares * price` at any later bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongPosition {
    pub opened_at: f64,
    pub opened_bar: usize,
    pub opened_ts: NaiveDateTime,
    pub shares: u64,
    pub entry_commission: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl LongPosition {
    pub fn market_value(&self, price: f64) -> f64 {
        price * self.shares as f64
    }

    pub fn stop_breached(&self, price: f64) -> bool {
        price < self.stop_loss
    }

    pub fn target_reached(&self, price: f64) -> bool {
        price > self.take_profit
    }
}

/// An open short position.
///
/// Only the commission is paid at entry. `entry_amount` is the cash notional
/// the shares were sold for; the position is worth
/// `entry_amount - shares * price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortPosition {
    pub opened_at: f64,
    pub opened_bar: usize,
    pub opened_ts: NaiveDateTime,
    pub shares: u64,
    pub entry_amount: f64,
    pub entry_commission: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl ShortPosition {
    pub fn market_value(&self, price: f64) -> f64 {
        self.entry_amount - price * self.shares as f64
    }

    pub fn stop_breached(&self, price: f64) -> bool {
        price > self.stop_loss
    }

    pub fn target_reached(&self, price: f64) -> bool {
        price < self.take_profit
    }
}

/// A position of either side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Position {
    Long(LongPosition),
    Short(ShortPosition),
}

impl Position {
    pub fn side(&self) -> PositionSide {
        match self {
            Self::Long(_) => PositionSide::Long,
            Self::Short(_) => PositionSide::Short,
        }
    }

    pub fn shares(&self) -> u64 {
        match self {
            Self::Long(p) => p.shares,
            Self::Short(p) => p.shares,
        }
    }

    pub fn opened_at(&self) -> f64 {
        match self {
            Self::Long(p) => p.opened_at,
            Self::Short(p) => p.opened_at,
        }
    }

    pub fn market_value(&self, price: f64) -> f64 {
        match self {
            Self::Long(p) => p.market_value(price),
            Self::Short(p) => p.market_value(price),
        }
    }
}
