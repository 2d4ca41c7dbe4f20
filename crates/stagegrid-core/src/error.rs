//! Configuration errors. All of them are fatal at startup.

use thiserror::Error;

/// Result type alias for configuration and catalog construction.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading configuration or building the catalog.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("stage catalog is empty")]
    EmptyCatalog,

    #[error("stage {index} has invalid value {value} (must be finite and > 0)")]
    InvalidStageValue { index: usize, value: f64 },

    #[error("stage value {0} appears more than once")]
    DuplicateStageValue(f64),

    #[error(
        "smallest stage {value} x {max_quantity} cannot absorb residuals below largest stage {largest}"
    )]
    InsufficientFineSupply {
        value: f64,
        max_quantity: u32,
        largest: f64,
    },

    #[error("invalid tuning constant {name} = {value}: {reason}")]
    InvalidTuning {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),

    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
