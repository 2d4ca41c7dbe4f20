//! Allocation strategies — naive, rate-limited, proportional, and
//! rate-limited with undershoot plus fine-stage gap correction.
//!
//! Exactly one strategy is active per deployment. It is chosen from
//! config once by [`build_strategy`] and called every cycle.

use std::fmt;
use std::sync::Arc;

use stagegrid_core::config::{StrategyKind, TuningConfig};
use stagegrid_core::{Allocation, StageCatalog};
use tracing::trace;

use crate::limiter::RateLimiter;
use crate::solver::DenominationSolver;

/// Turns a setpoint and the previous cycle's output into an allocation.
///
/// Implementations are pure: the same inputs always give the same
/// allocation.
pub trait Strategy: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn solver(&self) -> &DenominationSolver;

    /// The residual target handed to the solver.
    fn residual_target(&self, target: f64, previous_achieved: f64) -> f64;

    fn compute_allocation(&self, target: f64, previous_achieved: f64) -> Allocation {
        let residual = self.residual_target(target, previous_achieved);
        self.solver().allocate(residual)
    }
}

/// Build the configured strategy over `catalog`.
pub fn build_strategy(
    kind: StrategyKind,
    catalog: Arc<StageCatalog>,
    tuning: &TuningConfig,
) -> Box<dyn Strategy> {
    let solver = DenominationSolver::new(catalog);
    match kind {
        StrategyKind::Naive => Box::new(Naive::new(solver)),
        StrategyKind::RateLimited => Box::new(RateLimited::new(solver, tuning.max_rate)),
        StrategyKind::Proportional => {
            Box::new(Proportional::new(solver, tuning.proportional_gain))
        }
        StrategyKind::OptimalRateLimited => Box::new(OptimalRateLimited::new(
            solver,
            tuning.max_rate,
            tuning.undershoot_margin,
        )),
    }
}

/// Allocates the raw setpoint with no smoothing.
#[derive(Debug, Clone)]
pub struct Naive {
    solver: DenominationSolver,
}

impl Naive {
    pub fn new(solver: DenominationSolver) -> Self {
        Self { solver }
    }
}

impl Strategy for Naive {
    fn name(&self) -> &'static str {
        StrategyKind::Naive.as_str()
    }

    fn solver(&self) -> &DenominationSolver {
        &self.solver
    }

    fn residual_target(&self, target: f64, _previous_achieved: f64) -> f64 {
        target
    }
}

/// Moves at most `max_rate` per cycle toward the setpoint.
#[derive(Debug, Clone)]
pub struct RateLimited {
    solver: DenominationSolver,
    limiter: RateLimiter,
}

impl RateLimited {
    pub fn new(solver: DenominationSolver, max_rate: f64) -> Self {
        Self {
            solver,
            limiter: RateLimiter::new(max_rate),
        }
    }
}

impl Strategy for RateLimited {
    fn name(&self) -> &'static str {
        StrategyKind::RateLimited.as_str()
    }

    fn solver(&self) -> &DenominationSolver {
        &self.solver
    }

    fn residual_target(&self, target: f64, previous_achieved: f64) -> f64 {
        self.limiter.clamp(target, previous_achieved)
    }
}

/// First-order low-pass filter: closes `gain` of the remaining distance
/// each cycle. Never overshoots a held setpoint.
#[derive(Debug, Clone)]
pub struct Proportional {
    solver: DenominationSolver,
    gain: f64,
}

impl Proportional {
    pub fn new(solver: DenominationSolver, gain: f64) -> Self {
        Self { solver, gain }
    }
}

impl Strategy for Proportional {
    fn name(&self) -> &'static str {
        StrategyKind::Proportional.as_str()
    }

    fn solver(&self) -> &DenominationSolver {
        &self.solver
    }

    fn residual_target(&self, target: f64, previous_achieved: f64) -> f64 {
        previous_achieved + self.gain * (target - previous_achieved)
    }
}

/// Rate-limited toward `target - undershoot_margin`, then closes the gap
/// to the real target with the finest stage when its supply allows.
#[derive(Debug, Clone)]
pub struct OptimalRateLimited {
    solver: DenominationSolver,
    limiter: RateLimiter,
    undershoot_margin: f64,
}

impl OptimalRateLimited {
    pub fn new(solver: DenominationSolver, max_rate: f64, undershoot_margin: f64) -> Self {
        Self {
            solver,
            limiter: RateLimiter::new(max_rate),
            undershoot_margin,
        }
    }

    /// Adjust the smallest stage by `floor((target - achieved) / value)`
    /// units if the result stays within `[0, max_quantity]`. Returns
    /// whether the allocation changed.
    fn correct_gap(&self, allocation: &mut Allocation, target: f64) -> bool {
        let catalog = self.solver.catalog();
        let index = catalog.smallest_index();
        let smallest = catalog.smallest();

        let achieved = allocation.achieved(catalog);
        let gap = ((target - achieved) / smallest.value).floor();
        if !gap.is_finite() || gap == 0.0 {
            return false;
        }

        let current = allocation.quantity(index);
        let adjusted = f64::from(current) + gap;
        if adjusted < 0.0 || adjusted > f64::from(smallest.max_quantity) {
            trace!(gap, current, "gap correction out of range, skipped");
            return false;
        }

        allocation.set_quantity(index, adjusted as u32);
        trace!(gap, from = current, to = adjusted as u32, "gap corrected");
        true
    }
}

impl Strategy for OptimalRateLimited {
    fn name(&self) -> &'static str {
        StrategyKind::OptimalRateLimited.as_str()
    }

    fn solver(&self) -> &DenominationSolver {
        &self.solver
    }

    fn residual_target(&self, target: f64, previous_achieved: f64) -> f64 {
        self.limiter.clamp(target - self.undershoot_margin, previous_achieved)
    }

    fn compute_allocation(&self, target: f64, previous_achieved: f64) -> Allocation {
        let residual = self.residual_target(target, previous_achieved);
        let mut allocation = self.solver.allocate(residual);
        self.correct_gap(&mut allocation, target);
        allocation
    }
}
