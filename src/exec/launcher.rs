// src/exec/launcher.rs

//! Pluggable process launcher.
//!
//! The supervisor talks to a `ProcessLauncher` instead of spawning
//! processes itself. Production code uses [`TokioLauncher`]; tests can hand
//! in a launcher that scripts output and exit events without any OS process.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::errors::{CartmeshError, Result};
use crate::supervisor::{RunId, SupervisorEvent};

use super::environment::Environment;
use super::process_runner::run_process;
use super::termination::TerminationMode;

/// Fully resolved launch: the effective environment replaces the inherited
/// one entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub env: Environment,
}

/// Request to stop a running process, answered once it has exited.
#[derive(Debug)]
pub struct CancelRequest {
    pub mode: TerminationMode,
    /// Exit code of the stopped process (`-1` if killed by a signal).
    pub reply: oneshot::Sender<io::Result<i32>>,
}

/// Supervisor-side handle on one launched process.
///
/// Dropping it without cancelling makes the runner kill the process.
#[derive(Debug)]
pub struct ProcessControl {
    pid: Option<u32>,
    cancel: oneshot::Sender<CancelRequest>,
}

impl ProcessControl {
    pub fn new(pid: Option<u32>, cancel: oneshot::Sender<CancelRequest>) -> Self {
        Self { pid, cancel }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Ask the runner to stop the process with `mode`.
    ///
    /// If the runner is already gone the returned receiver resolves to an
    /// error immediately.
    pub fn request_cancel(self, mode: TerminationMode) -> oneshot::Receiver<io::Result<i32>> {
        let (reply, reply_rx) = oneshot::channel();
        if self.cancel.send(CancelRequest { mode, reply }).is_err() {
            debug!(pid = ?self.pid, "process runner already finished");
        }
        reply_rx
    }
}

/// Trait abstracting how a run's process is started.
pub trait ProcessLauncher: Send {
    /// Start the process for `run_id`.
    ///
    /// On success the implementation must deliver the run's output as
    /// `SupervisorEvent::Output` and, unless cancelled through the returned
    /// control, exactly one `SupervisorEvent::ProcessExited` after the last
    /// output event.
    fn launch(
        &mut self,
        spec: LaunchSpec,
        run_id: RunId,
        events: mpsc::Sender<SupervisorEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessControl>> + Send + '_>>;
}

/// Launcher that spawns real OS processes with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioLauncher;

impl ProcessLauncher for TokioLauncher {
    fn launch(
        &mut self,
        spec: LaunchSpec,
        run_id: RunId,
        events: mpsc::Sender<SupervisorEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessControl>> + Send + '_>> {
        Box::pin(async move {
            let mut cmd = Command::new(&spec.program);
            cmd.args(&spec.args)
                .current_dir(&spec.working_dir)
                .env_clear()
                .envs(&spec.env)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            // Group leader: cancellation signals the whole group, and the
            // terminal's Ctrl-C is not delivered to it.
            #[cfg(unix)]
            cmd.process_group(0);

            let child = cmd.spawn().map_err(|e| CartmeshError::Start {
                reason: format!("{}: {e}", spec.program),
            })?;

            let pid = child.id();
            info!(
                run_id,
                pid = ?pid,
                program = %spec.program,
                cwd = %spec.working_dir.display(),
                "process started"
            );

            let (cancel_tx, cancel_rx) = oneshot::channel();
            tokio::spawn(run_process(child, run_id, events, cancel_rx));

            Ok(ProcessControl::new(pid, cancel_tx))
        })
    }
}
