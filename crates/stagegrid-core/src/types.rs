//! Per-cycle types shared across StageGrid crates.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::StageCatalog;

/// Chosen quantity per stage for one cycle, indexed like the catalog
/// (largest value first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    quantities: Vec<u32>,
}

impl Allocation {
    /// All-zero allocation sized for `catalog`.
    pub fn empty(catalog: &StageCatalog) -> Self {
        Self {
            quantities: vec![0; catalog.len()],
        }
    }

    pub fn from_quantities(quantities: Vec<u32>) -> Self {
        Self { quantities }
    }

    pub fn quantities(&self) -> &[u32] {
        &self.quantities
    }

    pub fn quantity(&self, index: usize) -> u32 {
        self.quantities.get(index).copied().unwrap_or(0)
    }

    pub fn set_quantity(&mut self, index: usize, quantity: u32) {
        self.quantities[index] = quantity;
    }

    /// Realized output: Σ quantity·value.
    pub fn achieved(&self, catalog: &StageCatalog) -> f64 {
        self.quantities
            .iter()
            .zip(catalog.stages())
            .map(|(&q, s)| f64::from(q) * s.value)
            .sum()
    }

    /// Output weighted by each stage's variance factor.
    ///
    /// Reported alongside `achieved` for observation only. No decision in
    /// the control loop reads it.
    pub fn modeled_output(&self, catalog: &StageCatalog) -> f64 {
        self.quantities
            .iter()
            .zip(catalog.stages())
            .map(|(&q, s)| f64::from(q) * s.value * s.variance_factor)
            .sum()
    }

    /// True if every quantity is within its stage's supply.
    pub fn within_bounds(&self, catalog: &StageCatalog) -> bool {
        self.quantities.len() == catalog.len()
            && self
                .quantities
                .iter()
                .zip(catalog.stages())
                .all(|(&q, s)| q <= s.max_quantity)
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.quantities)
    }
}

/// Loop state carried from one cycle to the next.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlState {
    /// Index of the next cycle to run.
    pub cycle: u64,
    /// Setpoint read by the last completed cycle.
    pub setpoint: f64,
    /// Realized output of the last completed cycle.
    pub achieved: f64,
}

impl ControlState {
    /// Resume after the given persisted row.
    pub fn resume_from(record: &CycleRecord) -> Self {
        Self {
            cycle: record.cycle + 1,
            setpoint: record.setpoint,
            achieved: record.achieved,
        }
    }
}

/// One history row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub cycle: u64,
    pub setpoint: f64,
    pub achieved: f64,
}
