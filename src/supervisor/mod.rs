// src/supervisor/mod.rs

//! Subprocess supervision for the external meshing utility.
//!
//! This module ties together:
//! - the pure core state machine ([`core`]): state, log, affordances, and
//!   the ticker invariants, with no Tokio types and no IO
//! - the async shell ([`runtime`]) that owns the process control, the
//!   ticker task and the observer, and serializes every trigger through a
//!   single event channel
//!
//! Triggers (start request, process output, process exit, cancel, tick)
//! arrive as [`SupervisorEvent`]s and are handled one at a time.

use std::path::PathBuf;
use std::time::Duration;

use crate::exec::EnvironmentOverlay;
use crate::types::PlatformFamily;

pub mod core;
pub mod lines;
pub mod log;
pub mod observer;
pub mod runtime;
pub mod ticker;

pub use core::{CoreEffect, SupervisorCore};
pub use lines::LineBuffer;
pub use log::{LogColor, LogEntry, RunLog};
pub use observer::{ConsoleObserver, SupervisorObserver};
pub use runtime::Supervisor;
pub use ticker::Ticker;

/// Identifier of one launched run. Notifications from older runs are ignored.
pub type RunId = u64;

/// Lifecycle state of a supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Running,
    Cancelling,
}

/// Terminal value of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failed(i32),
    Cancelled,
    StartFailed(String),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }
}

/// Enabled state of the three control affordances shown by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordances {
    pub start: bool,
    pub cancel: bool,
    pub view_results: bool,
}

impl Affordances {
    pub const IDLE: Affordances = Affordances {
        start: true,
        cancel: false,
        view_results: false,
    };

    pub const RUNNING: Affordances = Affordances {
        start: false,
        cancel: true,
        view_results: false,
    };

    pub const CANCELLING: Affordances = Affordances {
        start: false,
        cancel: false,
        view_results: false,
    };

    pub const RESULTS_READY: Affordances = Affordances {
        start: true,
        cancel: false,
        view_results: true,
    };
}

impl Default for Affordances {
    fn default() -> Self {
        Affordances::IDLE
    }
}

/// Which pipe a chunk of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// What to launch. Produced by the caller or by a mesh case builder.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRequest {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub env_overlay: EnvironmentOverlay,
}

impl LaunchRequest {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            env_overlay: EnvironmentOverlay::default(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn env_overlay(mut self, overlay: EnvironmentOverlay) -> Self {
        self.env_overlay = overlay;
        self
    }

    /// `program arg1 arg2 ...`, for logging.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Events flowing into the supervisor from the host, the process runner and
/// the ticker.
#[derive(Debug, Clone)]
pub enum SupervisorEvent {
    /// The host asked for a new run.
    StartRequested(LaunchRequest),
    /// The process produced output. `chunk` need not end on a line boundary.
    Output {
        run_id: RunId,
        stream: OutputStream,
        chunk: Vec<u8>,
    },
    /// The process terminated on its own. Not sent for cancelled runs.
    ProcessExited { run_id: RunId, exit_code: i32 },
    /// The host asked to stop the active run.
    CancelRequested,
    /// Elapsed-time ticker fired.
    Tick { run_id: RunId },
    /// Stop the event loop, cancelling any active run first.
    ShutdownRequested,
}

/// Knobs for one supervisor instance.
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// Upper bound on the wait for a cancelled process to exit.
    pub cancel_timeout: Duration,
    /// Period of the elapsed-time ticker.
    pub tick_interval: Duration,
    pub platform: PlatformFamily,
    /// Prefix for lifecycle log messages, e.g. "Meshing completed".
    pub job_label: String,
    /// Extra note logged after a successful run, e.g. where to view it.
    pub completion_hint: Option<String>,
    /// Leave the event loop once a run reaches a terminal outcome.
    pub exit_when_idle: bool,
}

pub const DEFAULT_CANCEL_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            cancel_timeout: DEFAULT_CANCEL_TIMEOUT,
            tick_interval: DEFAULT_TICK_INTERVAL,
            platform: PlatformFamily::current(),
            job_label: "Meshing".to_string(),
            completion_hint: None,
            exit_when_idle: false,
        }
    }
}
