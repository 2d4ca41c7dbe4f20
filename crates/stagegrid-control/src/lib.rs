//! stagegrid-control — the cycle-by-cycle control loop.
//!
//! Each cycle reads the setpoint, picks the previous achieved output,
//! runs the active strategy, records the realized output, and advances
//! the control state. Cycles never overlap; cancellation is only observed
//! while waiting between them.
//!
//! ```text
//! loop:
//!     setpoint   = source.read()          // error → skip cycle
//!     previous   = state.achieved         // or last history row
//!     allocation = strategy.compute_allocation(setpoint, previous)
//!     achieved   = Σ qty · value
//!     history.append(cycle, setpoint, achieved)   // error → skip cycle
//!     state      = (cycle + 1, setpoint, achieved)
//!     wait cadence | shutdown
//! ```

pub mod control_loop;

pub use control_loop::{ControlLoop, CycleError, CycleReport};
