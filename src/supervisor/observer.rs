// src/supervisor/observer.rs

//! Output side of the supervisor: what the host UI layer gets told.

use tracing::{debug, error, info, warn};

use super::log::{LogColor, LogEntry};
use super::{Affordances, RunOutcome};

/// Receives log, affordance and outcome updates from a supervisor.
///
/// All methods default to no-ops so hosts implement only what they show.
pub trait SupervisorObserver: Send {
    fn log_cleared(&mut self) {}

    fn log_appended(&mut self, _entry: &LogEntry) {}

    /// Display-only elapsed-time text, e.g. `"Time: 3.0s"`.
    fn timer_updated(&mut self, _text: &str) {}

    fn affordances_changed(&mut self, _affordances: Affordances) {}

    /// Host-level error reporter; receives every stderr line.
    fn report_error(&mut self, _line: &str) {}

    fn run_finished(&mut self, _outcome: &RunOutcome) {}
}

/// Observer for the CLI: log lines go to stdout, everything else to
/// `tracing`.
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl SupervisorObserver for ConsoleObserver {
    fn log_appended(&mut self, entry: &LogEntry) {
        match entry.color {
            LogColor::Default => println!("{entry}"),
            LogColor::Error => println!("{entry} [error]"),
        }
    }

    fn timer_updated(&mut self, text: &str) {
        debug!("{text}");
    }

    fn affordances_changed(&mut self, affordances: Affordances) {
        debug!(
            start = affordances.start,
            cancel = affordances.cancel,
            view_results = affordances.view_results,
            "affordances changed"
        );
    }

    fn report_error(&mut self, line: &str) {
        error!(target: "cartmesh::process", "{line}");
    }

    fn run_finished(&mut self, outcome: &RunOutcome) {
        match outcome {
            RunOutcome::Success => info!("run finished successfully"),
            RunOutcome::Cancelled => info!("run cancelled"),
            RunOutcome::Failed(code) => warn!(exit_code = code, "run failed"),
            RunOutcome::StartFailed(reason) => warn!(%reason, "run failed to start"),
        }
    }
}
