// src/supervisor/core.rs

//! Pure core supervisor state machine.
//!
//! [`SupervisorCore`] owns everything that decides *what* happens: the
//! lifecycle state, the run log, the affordance flags, the per-stream line
//! buffers and whether the ticker should be running. Every transition takes
//! the current `Instant` explicitly and queues [`CoreEffect`]s; the async
//! shell (`supervisor::runtime::Supervisor`) drains them and performs the IO
//! (observer callbacks, ticker task).
//!
//! The core has no channels, no Tokio types and no processes, so it can be
//! driven step by step in tests.

use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::errors::{CartmeshError, Result};

use super::lines::LineBuffer;
use super::log::{LogColor, LogEntry, RunLog};
use super::{Affordances, OutputStream, RunId, RunOutcome, SupervisorState};

/// Something the shell must do or publish after a core transition.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEffect {
    LogCleared,
    Log(LogEntry),
    Timer(String),
    Affordances(Affordances),
    /// A stderr line for the host-level error reporter.
    ErrorLine(String),
    StartTicker(RunId),
    StopTicker,
    Outcome(RunOutcome),
}

#[derive(Debug)]
pub struct SupervisorCore {
    state: SupervisorState,
    log: RunLog,
    affordances: Affordances,
    ticker_running: bool,
    current_run: Option<RunId>,
    last_run: RunId,
    /// Between `begin_attempt` and the terminal outcome of that attempt.
    attempt_open: bool,
    stdout: LineBuffer,
    stderr: LineBuffer,
    pending_cancel: Option<String>,
    /// Set once a cancelled process failed to exit in time.
    fault: Option<Duration>,
    job_label: String,
    completion_hint: Option<String>,
    effects: Vec<CoreEffect>,
}

impl SupervisorCore {
    pub fn new(job_label: impl Into<String>) -> Self {
        Self {
            state: SupervisorState::Idle,
            log: RunLog::new(),
            affordances: Affordances::IDLE,
            ticker_running: false,
            current_run: None,
            last_run: 0,
            attempt_open: false,
            stdout: LineBuffer::new(),
            stderr: LineBuffer::new(),
            pending_cancel: None,
            fault: None,
            job_label: job_label.into(),
            completion_hint: None,
            effects: Vec::new(),
        }
    }

    pub fn with_completion_hint(mut self, hint: Option<String>) -> Self {
        self.completion_hint = hint;
        self
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    pub fn affordances(&self) -> Affordances {
        self.affordances
    }

    pub fn ticker_running(&self) -> bool {
        self.ticker_running
    }

    pub fn current_run(&self) -> Option<RunId> {
        self.current_run
    }

    /// Reason recorded by the most recent `begin_cancel`.
    pub fn pending_cancel(&self) -> Option<&str> {
        self.pending_cancel.as_deref()
    }

    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }

    /// Take the effects queued since the last call.
    pub fn take_effects(&mut self) -> Vec<CoreEffect> {
        std::mem::take(&mut self.effects)
    }

    /// Check the start precondition without changing anything.
    pub fn ensure_idle(&self) -> Result<()> {
        if let Some(timeout) = self.fault {
            return Err(CartmeshError::CancelTimeout { timeout });
        }
        match self.state {
            SupervisorState::Idle => Ok(()),
            SupervisorState::Running | SupervisorState::Cancelling => {
                Err(CartmeshError::AlreadyRunning)
            }
        }
    }

    /// Open a new start attempt: clear the log and restart its clock.
    ///
    /// The state stays `Idle` until [`SupervisorCore::spawned`].
    pub fn begin_attempt(&mut self, now: Instant) {
        debug_assert_eq!(self.state, SupervisorState::Idle);
        self.log.reset(now);
        self.stdout.clear();
        self.stderr.clear();
        self.pending_cancel = None;
        self.attempt_open = true;
        self.effects.push(CoreEffect::LogCleared);
    }

    /// Informational log line during an open attempt or run.
    pub fn note(&mut self, now: Instant, text: impl Into<String>) {
        self.append(now, LogColor::Default, text);
    }

    pub fn note_error(&mut self, now: Instant, text: impl Into<String>) {
        self.append(now, LogColor::Error, text);
    }

    pub fn allocate_run_id(&mut self) -> RunId {
        self.last_run += 1;
        self.last_run
    }

    /// The process for `run_id` is up.
    pub fn spawned(&mut self, run_id: RunId) {
        debug!(run_id, "run started");
        self.state = SupervisorState::Running;
        self.current_run = Some(run_id);
        self.start_ticker(run_id);
        self.set_affordances(Affordances::RUNNING);
    }

    /// The attempt failed before a process was running.
    pub fn start_failed(&mut self, now: Instant, error: &CartmeshError) -> RunOutcome {
        warn!(error = %error, "start failed");
        self.note_error(now, error.to_string());
        self.state = SupervisorState::Idle;
        self.current_run = None;
        self.set_affordances(Affordances::IDLE);
        self.finish(RunOutcome::StartFailed(error.to_string()))
    }

    /// Buffer output for the active run. Output from any other run, or
    /// after the run ended, is dropped.
    pub fn ingest(&mut self, run_id: RunId, stream: OutputStream, chunk: &[u8]) {
        if self.state != SupervisorState::Running || self.current_run != Some(run_id) {
            trace!(run_id, ?stream, len = chunk.len(), "dropping output from inactive run");
            return;
        }
        match stream {
            OutputStream::Stdout => self.stdout.push(chunk),
            OutputStream::Stderr => self.stderr.push(chunk),
        }
    }

    /// Move complete buffered lines into the log: stdout first, then stderr.
    ///
    /// Stderr lines are logged in the error color and also queued for the
    /// host error reporter.
    pub fn on_output_available(&mut self, now: Instant) {
        if self.state != SupervisorState::Running {
            return;
        }
        self.drain_output(now, false);
    }

    /// Stop the active run on user request.
    ///
    /// Returns the run id the shell must stop. The state is `Cancelling`
    /// until [`SupervisorCore::cancel_completed`].
    pub fn begin_cancel(&mut self, now: Instant) -> Result<RunId> {
        let run_id = match (self.state, self.current_run) {
            (SupervisorState::Running, Some(run_id)) => run_id,
            _ => return Err(CartmeshError::NotRunning),
        };

        self.note(now, format!("{} manually stopped", self.job_label));
        self.pending_cancel = Some(format!("{} interrupted", self.job_label));
        self.state = SupervisorState::Cancelling;
        self.stop_ticker();
        self.set_affordances(Affordances::CANCELLING);
        Ok(run_id)
    }

    /// The cancelled process is gone. `exit_code` is `None` when it could not
    /// be collected.
    pub fn cancel_completed(&mut self, now: Instant, exit_code: Option<i32>) -> RunOutcome {
        debug_assert_eq!(self.state, SupervisorState::Cancelling);
        debug!(run_id = ?self.current_run, ?exit_code, "cancelled run stopped");

        if let Some(reason) = self.pending_cancel.clone() {
            self.note(now, reason);
        }
        self.stdout.clear();
        self.stderr.clear();
        self.state = SupervisorState::Idle;
        self.current_run = None;
        self.set_affordances(Affordances::IDLE);
        self.finish(RunOutcome::Cancelled)
    }

    /// The cancelled process outlived the timeout. The supervisor stays in
    /// `Cancelling` and refuses further starts.
    pub fn cancel_timed_out(&mut self, now: Instant, timeout: Duration) {
        self.note_error(
            now,
            format!(
                "{} process did not stop within {:.1}s",
                self.job_label,
                timeout.as_secs_f64()
            ),
        );
        self.fault = Some(timeout);
    }

    /// The process of `run_id` exited on its own.
    ///
    /// Returns `None` when the notification is stale (cancelled or older
    /// run), in which case nothing changes.
    pub fn process_exited(&mut self, now: Instant, run_id: RunId, exit_code: i32) -> Option<RunOutcome> {
        if self.state != SupervisorState::Running || self.current_run != Some(run_id) {
            debug!(run_id, exit_code, "ignoring exit of inactive run");
            return None;
        }

        // The pipes are closed, so a trailing partial line is complete.
        self.drain_output(now, true);

        let (affordances, outcome) = if exit_code == 0 {
            self.note(now, format!("{} completed", self.job_label));
            if let Some(hint) = self.completion_hint.clone() {
                self.note(now, hint);
            }
            (Affordances::RESULTS_READY, RunOutcome::Success)
        } else {
            self.note_error(
                now,
                format!("{} exited with error (exit code {exit_code})", self.job_label),
            );
            (Affordances::IDLE, RunOutcome::Failed(exit_code))
        };

        self.stop_ticker();
        self.state = SupervisorState::Idle;
        self.current_run = None;
        self.set_affordances(affordances);
        Some(self.finish(outcome))
    }

    /// Ticker fired. Produces the elapsed-time text while `run_id` is running.
    pub fn tick(&mut self, now: Instant, run_id: RunId) -> Option<String> {
        if !self.ticker_running || self.current_run != Some(run_id) {
            return None;
        }
        let text = format!("Time: {:.1}s", self.log.elapsed(now).as_secs_f64());
        self.effects.push(CoreEffect::Timer(text.clone()));
        Some(text)
    }

    fn drain_output(&mut self, now: Instant, flush: bool) {
        let mut out = self.stdout.drain_lines();
        let mut err = self.stderr.drain_lines();
        if flush {
            out.extend(self.stdout.flush());
            err.extend(self.stderr.flush());
        }

        for line in out {
            self.append(now, LogColor::Default, line);
        }
        for line in err {
            self.append(now, LogColor::Error, line.clone());
            self.effects.push(CoreEffect::ErrorLine(line));
        }
    }

    fn append(&mut self, now: Instant, color: LogColor, text: impl Into<String>) {
        if !self.attempt_open {
            trace!("log is closed; dropping entry");
            return;
        }
        let entry = self.log.append(now, color, text).clone();
        self.effects.push(CoreEffect::Log(entry));
    }

    fn start_ticker(&mut self, run_id: RunId) {
        self.ticker_running = true;
        self.effects.push(CoreEffect::StartTicker(run_id));
    }

    fn stop_ticker(&mut self) {
        if self.ticker_running {
            self.ticker_running = false;
            self.effects.push(CoreEffect::StopTicker);
        }
    }

    fn set_affordances(&mut self, affordances: Affordances) {
        if self.affordances != affordances {
            self.affordances = affordances;
            self.effects.push(CoreEffect::Affordances(affordances));
        }
    }

    fn finish(&mut self, outcome: RunOutcome) -> RunOutcome {
        self.attempt_open = false;
        self.effects.push(CoreEffect::Outcome(outcome.clone()));
        outcome
    }
}
