//! stagegrid-alloc — turning a setpoint into a stage allocation.
//!
//! A [`Strategy`] pre-processes the raw setpoint into a residual target,
//! the [`DenominationSolver`] converts that residual into per-stage
//! quantities, and the optimal strategy optionally corrects the result
//! using the finest stage.
//!
//! # Allocation Algorithm
//!
//! ```text
//! naive:                residual = target
//! rate-limited:         residual = clamp(target, previous, max_rate)
//! proportional:         residual = previous + gain * (target - previous)
//! optimal-rate-limited: residual = clamp(target - margin, previous, max_rate)
//!
//! remaining = residual
//! for stage in stages (largest value first):
//!     qty[stage] = min(max_quantity, floor(remaining / value))
//!     remaining -= qty[stage] * value
//!
//! optimal only:
//!     gap = floor((target - achieved) / smallest.value)
//!     if 0 <= qty[smallest] + gap <= smallest.max_quantity:
//!         qty[smallest] += gap
//! ```
//!
//! The solver is greedy. It never overshoots its residual but does not
//! minimise the number of units used.

pub mod limiter;
pub mod solver;
pub mod strategy;

pub use limiter::{RateLimiter, clamp};
pub use solver::DenominationSolver;
pub use strategy::{
    Naive, OptimalRateLimited, Proportional, RateLimited, Strategy, build_strategy,
};
