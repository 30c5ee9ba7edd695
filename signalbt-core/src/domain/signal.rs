//! Named boolean signals carried by each bar.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The signal flags the indicator feed produces.
///
/// Serialized in the column spelling used by the data files (`RSI_BUY`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalName {
    RsiBuy,
    RsiSell,
    BbBuy,
    BbSell,
    MacdBuy,
    MacdSell,
}

impl SignalName {
    pub const ALL: [SignalName; 6] = [
        SignalName::RsiBuy,
        SignalName::RsiSell,
        SignalName::BbBuy,
        SignalName::BbSell,
        SignalName::MacdBuy,
        SignalName::MacdSell,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RsiBuy => "RSI_BUY",
            Self::RsiSell => "RSI_SELL",
            Self::BbBuy => "BB_BUY",
            Self::BbSell => "BB_SELL",
            Self::MacdBuy => "MACD_BUY",
            Self::MacdSell => "MACD_SELL",
        }
    }
}

impl fmt::Display for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised signal column name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signal name '{0}'")]
pub struct UnknownSignal(pub String);

impl FromStr for SignalName {
    type Err = UnknownSignal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        SignalName::ALL
            .into_iter()
            .find(|name| name.as_str() == upper)
            .ok_or_else(|| UnknownSignal(s.to_string()))
    }
}

/// The set of signal flags present on one bar.
///
/// A name that is absent is "not provided", which is different from `false`:
/// the engine rejects bars missing a signal its aggregation policy needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalSet(BTreeMap<SignalName, bool>);

impl SignalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (SignalName, bool)>) -> Self {
        Self(pairs.into_iter().collect())
    }

    pub fn insert(&mut self, name: SignalName, value: bool) {
        self.0.insert(name, value);
    }

    pub fn get(&self, name: SignalName) -> Option<bool> {
        self.0.get(&name).copied()
    }

    /// `true` only if the signal is present and set.
    pub fn is_set(&self, name: SignalName) -> bool {
        self.get(name).unwrap_or(false)
    }

    pub fn contains(&self, name: SignalName) -> bool {
        self.0.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
