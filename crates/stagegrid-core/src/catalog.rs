//! Stage catalog — the fixed set of denominations the solver draws from.
//!
//! Stages are held strictly descending by value so the greedy solver can
//! walk them front to back. The catalog is validated once at construction
//! and never mutated afterwards.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::StageConfig;
use crate::error::{ConfigError, ConfigResult};

/// Half-width of the band variance factors are drawn from when a stage
/// does not pin one explicitly.
pub const VARIANCE_SPREAD: f64 = 0.1;

/// One denomination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// Output contributed by a single unit of this stage.
    pub value: f64,
    /// Units available per cycle.
    pub max_quantity: u32,
    /// Multiplicative deviation of real output from `value`. Not used by
    /// any strategy; see [`crate::Allocation::modeled_output`].
    pub variance_factor: f64,
}

impl Stage {
    pub fn new(value: f64, max_quantity: u32) -> Self {
        Self {
            value,
            max_quantity,
            variance_factor: 1.0,
        }
    }

    pub fn with_variance(mut self, variance_factor: f64) -> Self {
        self.variance_factor = variance_factor;
        self
    }
}

/// Immutable, validated list of stages, strictly descending by value.
#[derive(Debug, Clone, PartialEq)]
pub struct StageCatalog {
    stages: Vec<Stage>,
}

impl StageCatalog {
    /// Validate and sort the given stages.
    ///
    /// Input order does not matter. Fails on an empty list, non-positive or
    /// non-finite values, duplicates, or when the smallest stage cannot
    /// cover a residual just below the largest stage.
    pub fn new(mut stages: Vec<Stage>) -> ConfigResult<Self> {
        if stages.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }

        for (index, stage) in stages.iter().enumerate() {
            if !stage.value.is_finite() || stage.value <= 0.0 {
                return Err(ConfigError::InvalidStageValue {
                    index,
                    value: stage.value,
                });
            }
        }

        stages.sort_by(|a, b| b.value.total_cmp(&a.value));

        if let Some(pair) = stages.windows(2).find(|w| w[0].value == w[1].value) {
            return Err(ConfigError::DuplicateStageValue(pair[0].value));
        }

        // An unsaturated coarser stage leaves less than its own value behind,
        // so the finest stage must absorb anything under the largest value.
        if let [largest, .., smallest] = stages.as_slice() {
            let capacity = smallest.value * f64::from(smallest.max_quantity);
            if capacity < largest.value - smallest.value {
                return Err(ConfigError::InsufficientFineSupply {
                    value: smallest.value,
                    max_quantity: smallest.max_quantity,
                    largest: largest.value,
                });
            }
        }

        Ok(Self { stages })
    }

    /// Build a catalog from config entries, drawing variance factors for
    /// stages that do not set one.
    pub fn from_config(entries: &[StageConfig]) -> ConfigResult<Self> {
        Self::from_config_with_rng(entries, &mut rand::thread_rng())
    }

    /// Like [`from_config`](Self::from_config) with a caller-supplied RNG.
    pub fn from_config_with_rng<R: Rng>(
        entries: &[StageConfig],
        rng: &mut R,
    ) -> ConfigResult<Self> {
        let stages = entries
            .iter()
            .map(|e| {
                let variance = match e.variance_factor {
                    Some(v) => v,
                    None => 1.0 + rng.gen_range(-VARIANCE_SPREAD..VARIANCE_SPREAD),
                };
                Stage::new(e.value, e.max_quantity).with_variance(variance)
            })
            .collect();
        let catalog = Self::new(stages)?;
        debug!(stages = catalog.len(), "stage catalog built");
        Ok(catalog)
    }

    /// Stages, largest value first.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false for a constructed catalog.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Index of the finest-grained stage.
    pub fn smallest_index(&self) -> usize {
        self.stages.len() - 1
    }

    /// The finest-grained stage.
    pub fn smallest(&self) -> &Stage {
        &self.stages[self.smallest_index()]
    }

    /// Largest output the catalog can realize in one cycle.
    pub fn ceiling(&self) -> f64 {
        self.stages
            .iter()
            .map(|s| s.value * f64::from(s.max_quantity))
            .sum()
    }
}
