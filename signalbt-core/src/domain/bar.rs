//! Bar: the fundamental market data unit fed to the engine.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::signal::{SignalName, SignalSet};

/// A raw `(timestamp, close)` observation before any signals are attached.
///
/// This is what the data loader produces and what the indicator feed consumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: NaiveDateTime,
    pub close: f64,
}

impl PricePoint {
    pub fn new(timestamp: NaiveDateTime, close: f64) -> Self {
        Self { timestamp, close }
    }
}

/// One bar-close observation with its precomputed boolean signals.
///
/// Bars are immutable once produced. The engine requires them in strictly
/// increasing timestamp order; fills happen only at `close`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub signals: SignalSet,
}

impl Bar {
    pub fn new(timestamp: NaiveDateTime, close: f64, signals: SignalSet) -> Self {
        Self {
            timestamp,
            close,
            signals,
        }
    }

    /// Value of a named signal, `None` if the feed did not provide it.
    pub fn signal(&self, name: SignalName) -> Option<bool> {
        self.signals.get(name)
    }

    /// A bar is usable if its close is finite and strictly positive.
    pub fn has_valid_close(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}
