//! stagegrid-core — shared types for StageGrid.
//!
//! Holds the stage catalog, the per-cycle allocation and control state,
//! and the `stagegrid.toml` configuration parser. Everything here is
//! plain data; the algorithms live in `stagegrid-alloc` and the loop in
//! `stagegrid-control`.

pub mod catalog;
pub mod config;
pub mod error;
pub mod types;

pub use catalog::{Stage, StageCatalog};
pub use config::StageGridConfig;
pub use error::{ConfigError, ConfigResult};
pub use types::*;
