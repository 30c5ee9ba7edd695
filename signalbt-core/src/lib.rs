//! signalbt core: domain types, position ledger, simulation engine, signal feed.
//!
//! This crate contains the deterministic heart of the backtester:
//! - Domain types (bars, signals, positions, trades, strategy parameters)
//! - Position ledger with at most one long and one short open
//! - Bar-by-bar simulation loop with four phases per bar
//! - Indicators and the boolean signal feed built on them

pub mod domain;
pub mod engine;
pub mod feed;
pub mod indicators;
pub mod ledger;

pub use domain::{Bar, PricePoint, StrategyParameters};
pub use engine::{run_simulation, EngineConfig, SimulationError, SimulationResult};
pub use feed::{build_signal_feed, FeedConfig, FeedError};
pub use ledger::{Ledger, LedgerError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a search worker moves across threads
    /// is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::PricePoint>();
        require_sync::<domain::PricePoint>();
        require_send::<domain::SignalSet>();
        require_sync::<domain::SignalSet>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::TradeRecord>();
        require_sync::<domain::TradeRecord>();
        require_send::<domain::StrategyParameters>();
        require_sync::<domain::StrategyParameters>();

        // Ledger and engine types
        require_send::<ledger::Ledger>();
        require_sync::<ledger::Ledger>();
        require_send::<engine::EngineConfig>();
        require_sync::<engine::EngineConfig>();
        require_send::<engine::SimulationResult>();
        require_sync::<engine::SimulationResult>();
        require_send::<engine::SimulationError>();
        require_sync::<engine::SimulationError>();

        // Feed
        require_send::<feed::FeedConfig>();
        require_sync::<feed::FeedConfig>();
    }

    /// Architecture contract: indicators see closes only.
    ///
    /// `compute()` takes a close slice, never the ledger, so signals cannot
    /// depend on portfolio state.
    #[test]
    fn indicator_trait_has_no_ledger_parameter() {
        fn _check_trait_object_builds(ind: &dyn indicators::Indicator, closes: &[f64]) -> Vec<f64> {
            ind.compute(closes)
        }
    }
}
