//! Signal aggregation: turns a bar's named flags into buy/sell triggers.

use serde::{Deserialize, Serialize};

use crate::domain::{SignalName, SignalSet};

const SINGLE_REQUIRED: [SignalName; 2] = [SignalName::RsiBuy, SignalName::RsiSell];

const BUY_VOTERS: [SignalName; 3] = [SignalName::RsiBuy, SignalName::BbBuy, SignalName::MacdBuy];
const SELL_VOTERS: [SignalName; 3] = [
    SignalName::RsiSell,
    SignalName::BbSell,
    SignalName::MacdSell,
];

/// How buy and sell scores are derived from the signal flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// `buy = RSI_BUY`, `sell = RSI_SELL`.
    SingleIndicator,
    /// Count of RSI/BB/MACD flags per side; two of three trigger.
    #[default]
    MajorityVote,
}

/// Per-side vote counts for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalScores {
    pub buy: u8,
    pub sell: u8,
}

impl AggregationPolicy {
    /// Signal names every bar must carry under this policy.
    pub fn required_signals(&self) -> Vec<SignalName> {
        match self {
            Self::SingleIndicator => SINGLE_REQUIRED.to_vec(),
            Self::MajorityVote => BUY_VOTERS.iter().chain(SELL_VOTERS.iter()).copied().collect(),
        }
    }

    /// Minimum score that fires an entry.
    pub fn trigger_threshold(&self) -> u8 {
        match self {
            Self::SingleIndicator => 1,
            Self::MajorityVote => 2,
        }
    }

    pub fn scores(&self, signals: &SignalSet) -> SignalScores {
        match self {
            Self::SingleIndicator => SignalScores {
                buy: signals.is_set(SignalName::RsiBuy) as u8,
                sell: signals.is_set(SignalName::RsiSell) as u8,
            },
            Self::MajorityVote => SignalScores {
                buy: count_set(signals, &BUY_VOTERS),
                sell: count_set(signals, &SELL_VOTERS),
            },
        }
    }

    pub fn buy_triggered(&self, scores: SignalScores) -> bool {
        scores.buy >= self.trigger_threshold()
    }

    pub fn sell_triggered(&self, scores: SignalScores) -> bool {
        scores.sell >= self.trigger_threshold()
    }
}

fn count_set(signals: &SignalSet, names: &[SignalName]) -> u8 {
    names.iter().filter(|&&name| signals.is_set(name)).count() as u8
}
