//! stagegrid-io — the control loop's external collaborators.
//!
//! # Architecture
//!
//! ```text
//! SetpointSource (trait)
//!   ├── JsonSetpointFile   ← reads {"setpoint": 50.0} fresh each cycle
//!   └── ScriptedSetpoints  ← in-memory sequence (tests, demos)
//!
//! HistorySink (trait)
//!   ├── CsvHistoryLog      ← append-only cycle,setpoint,achieved
//!   └── MemoryHistory      ← in-memory rows (tests)
//! ```
//!
//! Input errors skip a cycle; history read errors fall back to 0. Neither
//! is fatal.

pub mod error;
pub mod history;
pub mod setpoint;

pub use error::{HistoryError, HistoryResult, InputError, InputResult};
pub use history::{CsvHistoryLog, HISTORY_HEADER, HistorySink, MemoryHistory};
pub use setpoint::{JsonSetpointFile, ScriptedSetpoints, SetpointSource};
