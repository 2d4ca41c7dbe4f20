//! Pieces of the daemon shared between the binary and its tests.

pub mod report;

pub use report::{check_report, load, solve_report};
