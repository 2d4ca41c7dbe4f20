//! Error types for setpoint input and the history log.

use std::path::PathBuf;

use thiserror::Error;

pub type InputResult<T> = Result<T, InputError>;

pub type HistoryResult<T> = Result<T, HistoryError>;

/// The setpoint document could not be turned into a target. The loop
/// skips the cycle and retries after the cadence.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read setpoint document {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("setpoint document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("setpoint document has no field {0:?}")]
    MissingField(String),

    #[error("setpoint field {0:?} is not a number")]
    NotANumber(String),

    #[error("setpoint {0} out of range (must be finite and >= 0)")]
    OutOfRange(f64),
}

/// History log failures.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("history csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("history log has no rows")]
    Empty,

    #[error("history row unparsable: {0}")]
    Unparsable(String),
}
