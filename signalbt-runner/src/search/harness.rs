//! Search harness: repeated backtests over a parameter space.
//!
//! Trials are proposed sequentially, one batch at a time, each from its own
//! RNG stream derived from the master seed. A batch is then evaluated, in
//! parallel when `parallelism > 1`. Cancellation is checked between batches;
//! a trial in flight always runs to completion.

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use signalbt_core::domain::StrategyParameters;

use super::sampler::SamplerKind;
use super::space::ParameterSpace;
use super::SearchError;
use crate::fitness::Objective;
use crate::rng::RngHierarchy;

/// Search settings, read from the `[search]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub n_trials: usize,
    pub seed: u64,
    pub objective: Objective,
    pub sampler: SamplerKind,
    /// Worker threads for trial evaluation; 1 evaluates inline.
    pub parallelism: usize,
    /// Trials proposed before the history is updated. Defaults to `parallelism`.
    pub batch_size: Option<usize>,
    pub space: ParameterSpace,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_trials: 50,
            seed: 42,
            objective: Objective::Sharpe,
            sampler: SamplerKind::default(),
            parallelism: 1,
            batch_size: None,
            space: ParameterSpace::default(),
        }
    }
}

impl SearchConfig {
    /// Check the execution settings and the configured space.
    pub fn validate(&self) -> Result<(), SearchError> {
        self.validate_settings()?;
        self.space.validate()
    }

    /// Check the execution settings only.
    pub fn validate_settings(&self) -> Result<(), SearchError> {
        if self.parallelism == 0 {
            return Err(SearchError::InvalidSetting("parallelism must be >= 1"));
        }
        if self.batch_size == Some(0) {
            return Err(SearchError::InvalidSetting("batch_size must be >= 1"));
        }
        Ok(())
    }

    fn effective_batch_size(&self) -> usize {
        self.batch_size.unwrap_or(self.parallelism).max(1)
    }
}

/// One evaluated trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub index: usize,
    pub params: StrategyParameters,
    /// Raw sampled values, one per space dimension.
    pub values: Vec<f64>,
    /// Objective value; `-inf` for failed or non-finite trials, written as
    /// `null` when serialized.
    #[serde(with = "failed_as_null")]
    pub score: f64,
    pub error: Option<String>,
}

impl TrialRecord {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// JSON has no infinities: a failed trial's `-inf` round-trips through `null`.
mod failed_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if score.is_finite() {
            serializer.serialize_some(score)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
    }
}

/// Best trial found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestResult {
    pub params: StrategyParameters,
    pub score: f64,
    pub trial_index: usize,
}

/// Result of a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// `None` when no trial ran or every trial failed.
    pub best: Option<BestResult>,
    pub trials: Vec<TrialRecord>,
    pub cancelled: bool,
}

impl SearchOutcome {
    pub fn failed_count(&self) -> usize {
        self.trials.iter().filter(|t| t.is_failure()).count()
    }
}

/// Drives trials through an objective function.
pub struct SearchHarness {
    config: SearchConfig,
    base: StrategyParameters,
    cancel: Arc<AtomicBool>,
}

impl SearchHarness {
    /// `base` supplies every parameter the space does not search.
    pub fn new(config: SearchConfig, base: StrategyParameters) -> Self {
        Self {
            config,
            base,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an externally owned cancellation flag.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run `n_trials` trials over `space`, maximizing `objective`.
    ///
    /// `SearchConfig::space` is not consulted here. A trial whose objective
    /// errors or returns a non-finite value is recorded with score `-inf`;
    /// the search carries on.
    pub fn run<F, E>(
        &self,
        space: &ParameterSpace,
        n_trials: usize,
        objective: F,
    ) -> Result<SearchOutcome, SearchError>
    where
        F: Fn(&StrategyParameters) -> Result<f64, E> + Sync,
        E: Display,
    {
        self.config.validate_settings()?;
        space.validate()?;

        let start = Instant::now();
        let rng_hierarchy = RngHierarchy::new(self.config.seed);
        let mut sampler = self.config.sampler.build();
        let batch_size = self.config.effective_batch_size();

        let thread_pool = if self.config.parallelism > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(self.config.parallelism)
                    .build()
                    .map_err(|e| SearchError::ThreadPool(e.to_string()))?,
            )
        } else {
            None
        };

        info!(
            "search: {} trials, sampler {}, objective {:?}, {} thread(s)",
            n_trials,
            sampler.name(),
            self.config.objective,
            self.config.parallelism
        );

        let mut trials: Vec<TrialRecord> = Vec::with_capacity(n_trials);
        let mut best: Option<BestResult> = None;
        let mut cancelled = false;

        while trials.len() < n_trials {
            if self.cancel.load(Ordering::Relaxed) {
                cancelled = true;
                info!("search cancelled after {} trials", trials.len());
                break;
            }

            let first = trials.len();
            let last = (first + batch_size).min(n_trials);
            let proposals: Vec<(usize, Vec<f64>)> = (first..last)
                .map(|index| {
                    let mut rng = rng_hierarchy.rng_for("sampler", index as u64);
                    (index, sampler.propose(space, &trials, index, &mut rng))
                })
                .collect();

            let evaluate = |(index, values): &(usize, Vec<f64>)| {
                let params = space.apply(&self.base, values);
                let (score, error) = match objective(&params) {
                    Ok(score) if score.is_finite() => (score, None),
                    Ok(score) => (f64::NEG_INFINITY, Some(format!("non-finite score {score}"))),
                    Err(e) => (f64::NEG_INFINITY, Some(e.to_string())),
                };
                TrialRecord {
                    index: *index,
                    params,
                    values: values.clone(),
                    score,
                    error,
                }
            };

            let batch: Vec<TrialRecord> = if let Some(ref tp) = thread_pool {
                tp.install(|| proposals.par_iter().map(evaluate).collect())
            } else {
                proposals.iter().map(evaluate).collect()
            };

            for record in batch {
                if let Some(ref error) = record.error {
                    warn!("trial {} failed: {}", record.index, error);
                } else if best
                    .as_ref()
                    .map_or(true, |b| self.config.objective.is_better(record.score, b.score))
                {
                    info!("trial {}: new best {:.6}", record.index, record.score);
                    best = Some(BestResult {
                        params: record.params.clone(),
                        score: record.score,
                        trial_index: record.index,
                    });
                }
                trials.push(record);
            }

            debug!("search progress: {}/{}", trials.len(), n_trials);
        }

        info!(
            "search finished: {} trials in {:.2}s, best {}",
            trials.len(),
            start.elapsed().as_secs_f64(),
            best.as_ref()
                .map_or_else(|| "none".to_string(), |b| format!("{:.6}", b.score))
        );

        Ok(SearchOutcome {
            best,
            trials,
            cancelled,
        })
    }
}
