//! Up-front input validation.
//!
//! Everything here runs before the first bar is processed: a malformed feed is
//! rejected whole, never partially simulated.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::domain::{Bar, ParamError, SignalName};

use super::aggregation::AggregationPolicy;

/// Structural problems with the bar sequence.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedInput {
    #[error("bar sequence is empty")]
    EmptyBars,
    #[error("bar {index}: timestamp {current} is not after {previous}")]
    NonIncreasingTimestamp {
        index: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },
    #[error("bar {index}: missing required signal {signal}")]
    MissingSignal { index: usize, signal: SignalName },
    #[error("bar {index}: close must be finite and positive, got {close}")]
    InvalidClose { index: usize, close: f64 },
}

/// Errors that stop a simulation before it starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("malformed input: {0}")]
    Malformed(#[from] MalformedInput),
    #[error("invalid strategy parameters: {0}")]
    Params(#[from] ParamError),
    #[error("initial capital must be finite and positive, got {0}")]
    InitialCapital(f64),
}

/// Check ordering, closes and required signals for every bar.
pub fn validate_bars(bars: &[Bar], policy: AggregationPolicy) -> Result<(), MalformedInput> {
    if bars.is_empty() {
        return Err(MalformedInput::EmptyBars);
    }
    let required = policy.required_signals();

    for (index, bar) in bars.iter().enumerate() {
        if !bar.has_valid_close() {
            return Err(MalformedInput::InvalidClose {
                index,
                close: bar.close,
            });
        }
        if let Some(&signal) = required.iter().find(|&&s| !bar.signals.contains(s)) {
            return Err(MalformedInput::MissingSignal { index, signal });
        }
        if index > 0 {
            let previous = bars[index - 1].timestamp;
            if bar.timestamp <= previous {
                return Err(MalformedInput::NonIncreasingTimestamp {
                    index,
                    previous,
                    current: bar.timestamp,
                });
            }
        }
    }
    Ok(())
}
