//! Samplers: how the next trial's parameter values are chosen.
//!
//! Every sampler draws from the RNG it is handed, so a fixed master seed
//! fixes the whole sequence of proposals.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::harness::TrialRecord;
use super::space::ParameterSpace;

/// Proposes one point of the space per trial.
pub trait Sampler {
    fn name(&self) -> &'static str;

    /// Values for trial `trial_index`, one per dimension of `space`.
    ///
    /// `history` holds every trial evaluated so far, in index order.
    fn propose(
        &mut self,
        space: &ParameterSpace,
        history: &[TrialRecord],
        trial_index: usize,
        rng: &mut StdRng,
    ) -> Vec<f64>;
}

// ─── Random ─────────────────────────────────────────────────────────

/// Independent uniform draws.
#[derive(Debug, Clone, Default)]
pub struct RandomSampler;

impl Sampler for RandomSampler {
    fn name(&self) -> &'static str {
        "random"
    }

    fn propose(
        &mut self,
        space: &ParameterSpace,
        _history: &[TrialRecord],
        _trial_index: usize,
        rng: &mut StdRng,
    ) -> Vec<f64> {
        space.sample(rng)
    }
}

// ─── Grid ───────────────────────────────────────────────────────────

/// Walks the cartesian product of per-dimension grids, first dimension
/// fastest. Wraps around once every point has been visited.
#[derive(Debug, Clone)]
pub struct GridSampler {
    steps: usize,
}

impl GridSampler {
    pub fn new(steps: usize) -> Self {
        Self { steps: steps.max(1) }
    }
}

impl Sampler for GridSampler {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn propose(
        &mut self,
        space: &ParameterSpace,
        _history: &[TrialRecord],
        trial_index: usize,
        _rng: &mut StdRng,
    ) -> Vec<f64> {
        let axes: Vec<Vec<f64>> = space.dims().iter().map(|d| d.domain.grid(self.steps)).collect();
        let mut rest = trial_index;
        axes.iter()
            .map(|axis| {
                let radix = axis.len().max(1);
                let value = axis.get(rest % radix).copied().unwrap_or(0.0);
                rest /= radix;
                value
            })
            .collect()
    }
}

// ─── Local search ───────────────────────────────────────────────────

/// Random warm-up, then perturbations around the best trials seen so far
/// with a shrinking neighbourhood.
#[derive(Debug, Clone)]
pub struct LocalSearchSampler {
    config: LocalSearchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSearchConfig {
    /// Trials drawn uniformly before any perturbation.
    pub startup_trials: usize,
    /// Parents are picked uniformly among this many best trials.
    pub top_k: usize,
    /// Neighbourhood width as a fraction of each domain's width.
    pub initial_scale: f64,
    pub min_scale: f64,
    /// Per-trial multiplicative shrink of the neighbourhood.
    pub decay: f64,
}

impl Default for LocalSearchConfig {
    fn default() -> Self {
        Self {
            startup_trials: 10,
            top_k: 5,
            initial_scale: 0.5,
            min_scale: 0.05,
            decay: 0.97,
        }
    }
}

impl LocalSearchSampler {
    pub fn new(config: LocalSearchConfig) -> Self {
        Self { config }
    }

    fn scale_at(&self, trial_index: usize) -> f64 {
        let steps = trial_index.saturating_sub(self.config.startup_trials) as i32;
        (self.config.initial_scale * self.config.decay.powi(steps)).max(self.config.min_scale)
    }
}

impl Sampler for LocalSearchSampler {
    fn name(&self) -> &'static str {
        "local_search"
    }

    fn propose(
        &mut self,
        space: &ParameterSpace,
        history: &[TrialRecord],
        trial_index: usize,
        rng: &mut StdRng,
    ) -> Vec<f64> {
        let mut scored: Vec<&TrialRecord> =
            history.iter().filter(|t| t.score.is_finite()).collect();
        if trial_index < self.config.startup_trials || scored.is_empty() {
            return space.sample(rng);
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.index.cmp(&b.index)));
        scored.truncate(self.config.top_k.max(1));
        let parent = scored[rng.gen_range(0..scored.len())];

        let scale = self.scale_at(trial_index);
        space
            .dims()
            .iter()
            .zip(&parent.values)
            .map(|(dim, &value)| dim.domain.perturb(value, scale, rng))
            .collect()
    }
}

// ─── Selection ──────────────────────────────────────────────────────

/// Sampler choice as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SamplerKind {
    Random,
    Grid {
        #[serde(default = "default_grid_steps")]
        steps: usize,
    },
    LocalSearch(LocalSearchConfig),
}

fn default_grid_steps() -> usize {
    5
}

impl Default for SamplerKind {
    fn default() -> Self {
        Self::LocalSearch(LocalSearchConfig::default())
    }
}

impl SamplerKind {
    pub fn build(&self) -> Box<dyn Sampler> {
        match self {
            Self::Random => Box::new(RandomSampler),
            Self::Grid { steps } => Box::new(GridSampler::new(*steps)),
            Self::LocalSearch(config) => Box::new(LocalSearchSampler::new(config.clone())),
        }
    }
}
