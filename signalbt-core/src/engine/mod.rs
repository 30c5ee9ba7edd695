//! Simulation engine: bar-by-bar loop over a precomputed signal feed.
//!
//! The engine consumes bars that already carry their boolean signals and runs
//! the four-phase bar loop:
//!
//! 1. Close: stop-loss and take-profit checks on open positions
//! 2. Aggregate: buy/sell scores under the configured policy
//! 3. Open: long on a buy trigger, short on a sell trigger
//! 4. Valuation: mark-to-market equity point

pub mod aggregation;
pub mod loop_runner;
pub mod state;
pub mod validate;

pub use aggregation::{AggregationPolicy, SignalScores};
pub use loop_runner::{run_simulation, Simulation};
pub use state::{EngineConfig, EngineState, SimulationResult, TerminalPolicy};
pub use validate::{validate_bars, MalformedInput, SimulationError};
