use std::sync::{Arc, Mutex};

use cartmesh::supervisor::{Affordances, LogEntry, RunOutcome, SupervisorObserver};

/// Everything a supervisor told its observer, in order.
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub cleared: usize,
    pub entries: Vec<LogEntry>,
    pub timers: Vec<String>,
    pub affordances: Vec<Affordances>,
    pub errors: Vec<String>,
    pub outcomes: Vec<RunOutcome>,
}

impl Recorded {
    /// Texts of the log entries since the last clear.
    pub fn texts(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.text.clone()).collect()
    }
}

/// Observer that records into shared state; clones see the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Recorded {
        self.inner.lock().unwrap().clone()
    }
}

impl SupervisorObserver for RecordingObserver {
    fn log_cleared(&mut self) {
        let mut rec = self.inner.lock().unwrap();
        rec.cleared += 1;
        rec.entries.clear();
    }

    fn log_appended(&mut self, entry: &LogEntry) {
        self.inner.lock().unwrap().entries.push(entry.clone());
    }

    fn timer_updated(&mut self, text: &str) {
        self.inner.lock().unwrap().timers.push(text.to_string());
    }

    fn affordances_changed(&mut self, affordances: Affordances) {
        self.inner.lock().unwrap().affordances.push(affordances);
    }

    fn report_error(&mut self, line: &str) {
        self.inner.lock().unwrap().errors.push(line.to_string());
    }

    fn run_finished(&mut self, outcome: &RunOutcome) {
        self.inner.lock().unwrap().outcomes.push(outcome.clone());
    }
}
