//! Hyperparameter search over strategy parameters.

pub mod harness;
pub mod sampler;
pub mod space;

pub use harness::{BestResult, SearchConfig, SearchHarness, SearchOutcome, TrialRecord};
pub use sampler::{
    GridSampler, LocalSearchConfig, LocalSearchSampler, RandomSampler, Sampler, SamplerKind,
};
pub use space::{ParamDimension, ParamDomain, ParamKey, ParameterSpace};

use thiserror::Error;

/// Errors that stop a search before its first trial.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("parameter space has no dimensions")]
    EmptySpace,
    #[error("invalid domain for {key}: {reason}")]
    InvalidDomain { key: &'static str, reason: String },
    #[error("parameter {0} appears more than once in the space")]
    DuplicateKey(&'static str),
    #[error("invalid search setting: {0}")]
    InvalidSetting(&'static str),
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}
