//! Greedy denomination solver.

use std::sync::Arc;

use stagegrid_core::{Allocation, StageCatalog};

/// Converts a residual target into per-stage quantities, walking the
/// catalog from the largest stage down.
///
/// The realized sum never exceeds the residual. Leftover is below the
/// smallest stage's value unless the smallest stage, or every coarser
/// stage, hits its supply cap; the catalog's
/// [`ceiling`](StageCatalog::ceiling) is the most that can be realized.
#[derive(Debug, Clone)]
pub struct DenominationSolver {
    catalog: Arc<StageCatalog>,
}

impl DenominationSolver {
    pub fn new(catalog: Arc<StageCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }

    /// Allocate stages for `residual_target`. Zero, negative and
    /// non-finite residuals yield an all-zero allocation.
    pub fn allocate(&self, residual_target: f64) -> Allocation {
        let mut allocation = Allocation::empty(&self.catalog);
        if !residual_target.is_finite() || residual_target <= 0.0 {
            return allocation;
        }

        let mut remaining = residual_target;
        for (index, stage) in self.catalog.stages().iter().enumerate() {
            let fits = (remaining / stage.value).floor().max(0.0);
            let mut quantity = fits.min(f64::from(stage.max_quantity)) as u32;
            // Division can round up to the next integer.
            if quantity > 0 && f64::from(quantity) * stage.value > remaining {
                quantity -= 1;
            }
            remaining -= f64::from(quantity) * stage.value;
            allocation.set_quantity(index, quantity);
        }

        allocation
    }
}
