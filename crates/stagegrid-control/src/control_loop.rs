//! ControlLoop — owns the control state and drives one strategy.

use std::time::Duration;

use stagegrid_alloc::Strategy;
use stagegrid_core::config::Recovery;
use stagegrid_core::{Allocation, ControlState, CycleRecord};
use stagegrid_io::{HistoryError, HistorySink, InputError, SetpointSource};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

/// Why a cycle did not complete. State is left untouched in both cases.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("setpoint unavailable: {0}")]
    Input(#[from] InputError),

    #[error("history append failed: {0}")]
    Append(#[from] HistoryError),
}

/// What a completed cycle did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// The row appended to history.
    pub record: CycleRecord,
    /// The "previous achieved" the strategy was given.
    pub previous_achieved: f64,
    pub allocation: Allocation,
    /// Output weighted by stage variance factors. Informational.
    pub modeled_output: f64,
}

/// Drives cycles for a single setpoint.
pub struct ControlLoop<S, H> {
    strategy: Box<dyn Strategy>,
    setpoints: S,
    history: H,
    state: ControlState,
    recovery: Recovery,
    cadence: Duration,
}

impl<S: SetpointSource, H: HistorySink> ControlLoop<S, H> {
    /// New loop at cycle 0 with nothing achieved, memory recovery, and a
    /// 500ms cadence.
    pub fn new(strategy: Box<dyn Strategy>, setpoints: S, history: H) -> Self {
        Self {
            strategy,
            setpoints,
            history,
            state: ControlState::default(),
            recovery: Recovery::Memory,
            cadence: Duration::from_millis(500),
        }
    }

    pub fn with_recovery(mut self, recovery: Recovery) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    /// Continue numbering and output from the history log's last row.
    /// Falls back to a fresh state when the log has nothing usable.
    pub fn resume_from_history(mut self) -> Self {
        match self.history.last_record() {
            Ok(record) => {
                self.state = ControlState::resume_from(&record);
                info!(
                    cycle = self.state.cycle,
                    achieved = self.state.achieved,
                    "resumed from history"
                );
            }
            Err(HistoryError::Empty) => debug!("history empty, starting at cycle 0"),
            Err(e) => warn!(error = %e, "cannot resume from history, starting at cycle 0"),
        }
        self
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy.as_ref()
    }

    /// Run exactly one cycle.
    pub fn step(&mut self) -> Result<CycleReport, CycleError> {
        let setpoint = self.setpoints.read()?;
        let previous_achieved = self.previous_achieved();

        let allocation = self.strategy.compute_allocation(setpoint, previous_achieved);
        let catalog = self.strategy.solver().catalog();
        let achieved = allocation.achieved(catalog);
        let modeled_output = allocation.modeled_output(catalog);

        let record = CycleRecord {
            cycle: self.state.cycle,
            setpoint,
            achieved,
        };
        self.history.append(&record)?;

        self.state = ControlState {
            cycle: self.state.cycle + 1,
            setpoint,
            achieved,
        };

        debug!(
            cycle = record.cycle,
            setpoint,
            previous = previous_achieved,
            achieved,
            allocation = %allocation,
            "cycle complete"
        );
        trace!(cycle = record.cycle, modeled_output, "modeled output");

        Ok(CycleReport {
            record,
            previous_achieved,
            allocation,
            modeled_output,
        })
    }

    fn previous_achieved(&self) -> f64 {
        match self.recovery {
            Recovery::Memory => self.state.achieved,
            Recovery::History => match self.history.last_achieved() {
                Ok(achieved) => achieved,
                Err(HistoryError::Empty) => 0.0,
                Err(e) => {
                    warn!(error = %e, "history unreadable, assuming nothing achieved");
                    0.0
                }
            },
        }
    }

    /// Run cycles until `shutdown` flips to true or its sender is dropped.
    ///
    /// A cycle in progress always completes; the signal is only checked
    /// before a cycle starts and during the wait after it.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            strategy = self.strategy.name(),
            cadence_ms = self.cadence.as_millis() as u64,
            cycle = self.state.cycle,
            "control loop started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.step() {
                Ok(_) => {}
                Err(CycleError::Input(e)) => {
                    warn!(cycle = self.state.cycle, error = %e, "skipping cycle");
                }
                Err(CycleError::Append(e)) => {
                    error!(cycle = self.state.cycle, error = %e, "history append failed, cycle not advanced");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.cadence) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!(cycle = self.state.cycle, "control loop shutting down");
    }
}
