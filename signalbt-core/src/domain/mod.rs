//! Domain types for signalbt

pub mod bar;
pub mod params;
pub mod position;
pub mod signal;
pub mod trade;

pub use bar::{Bar, PricePoint};
pub use params::{ParamError, StrategyParameters};
pub use position::{LongPosition, Position, PositionSide, ShortPosition};
pub use signal::{SignalName, SignalSet, UnknownSignal};
pub use trade::{ExitReason, TradeOutcome, TradeRecord, TradeTally};
