// src/supervisor/runtime.rs

use std::fmt;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::case::{MeshCaseBuilder, MeshParameters};
use crate::errors::{CartmeshError, Result};
use crate::exec::{
    HostEnvironment, LaunchSpec, ProcessControl, ProcessLauncher, SystemEnvironment,
    TerminationMode,
};

use super::core::{CoreEffect, SupervisorCore};
use super::observer::SupervisorObserver;
use super::ticker::Ticker;
use super::{
    Affordances, LaunchRequest, RunId, RunOutcome, SupervisorEvent, SupervisorOptions,
    SupervisorState,
};

/// Supervises one external process at a time.
///
/// This is the IO shell around [`SupervisorCore`], which holds the
/// semantics. The shell owns the process control, the ticker task and the
/// observer, and executes the effects the core queues. Every operation takes
/// `&mut self`, so operations on one instance never overlap; [`Supervisor::run`]
/// feeds them from a single event channel.
pub struct Supervisor<L: ProcessLauncher> {
    core: SupervisorCore,
    launcher: L,
    host_env: Box<dyn HostEnvironment>,
    observer: Box<dyn SupervisorObserver>,
    options: SupervisorOptions,
    events_tx: mpsc::Sender<SupervisorEvent>,
    active: Option<ProcessControl>,
    ticker: Option<Ticker>,
    last_outcome: Option<RunOutcome>,
}

impl<L: ProcessLauncher> fmt::Debug for Supervisor<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("core", &self.core)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<L: ProcessLauncher> Supervisor<L> {
    /// `events_tx` must be the sending half of the channel later passed to
    /// [`Supervisor::run`] (or pumped into [`Supervisor::handle_event`]).
    pub fn new(
        launcher: L,
        observer: Box<dyn SupervisorObserver>,
        options: SupervisorOptions,
        events_tx: mpsc::Sender<SupervisorEvent>,
    ) -> Self {
        Self {
            core: SupervisorCore::new(options.job_label.clone())
                .with_completion_hint(options.completion_hint.clone()),
            launcher,
            host_env: Box::new(SystemEnvironment),
            observer,
            options,
            events_tx,
            active: None,
            ticker: None,
            last_outcome: None,
        }
    }

    /// Replace the source of the inherited environment.
    pub fn with_host_environment(mut self, host_env: Box<dyn HostEnvironment>) -> Self {
        self.host_env = host_env;
        self
    }

    pub fn state(&self) -> SupervisorState {
        self.core.state()
    }

    pub fn affordances(&self) -> Affordances {
        self.core.affordances()
    }

    pub fn core(&self) -> &SupervisorCore {
        &self.core
    }

    /// Whether the elapsed-time ticker task is alive.
    pub fn ticker_active(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn last_outcome(&self) -> Option<&RunOutcome> {
        self.last_outcome.as_ref()
    }

    /// Start a new run.
    ///
    /// Rejected with `AlreadyRunning` while a run is active; the active run
    /// is not touched. Environment and spawn failures leave the supervisor
    /// `Idle`, are logged, and produce a `StartFailed` outcome.
    pub async fn start(&mut self, request: LaunchRequest) -> Result<RunId> {
        self.core.ensure_idle()?;
        self.core.begin_attempt(Instant::now());
        let result = self.launch(request).await;
        self.apply_effects();
        result
    }

    /// Write the mesh case with `builder`, then start its run command.
    ///
    /// Builder errors are logged and reported as `StartFailed` like spawn
    /// errors.
    pub async fn start_case(
        &mut self,
        builder: &dyn MeshCaseBuilder,
        params: &MeshParameters,
    ) -> Result<RunId> {
        self.core.ensure_idle()?;
        self.core.begin_attempt(Instant::now());
        self.core
            .note(Instant::now(), "Starting cut-cell Cartesian meshing ...");
        self.apply_effects();

        let request = match builder.prepare(params) {
            Ok(request) => request,
            Err(e) => {
                self.core.start_failed(Instant::now(), &e);
                self.apply_effects();
                return Err(e);
            }
        };

        self.core
            .note(Instant::now(), format!("Running {} ...", params.mesh_utility));
        let result = self.launch(request).await;
        self.apply_effects();
        result
    }

    async fn launch(&mut self, request: LaunchRequest) -> Result<RunId> {
        let env = match request.env_overlay.build(self.host_env.as_ref()) {
            Ok(env) => env,
            Err(e) => {
                self.core.start_failed(Instant::now(), &e);
                return Err(e);
            }
        };

        let run_id = self.core.allocate_run_id();
        info!(run_id, command = %request.command_line(), "executing");

        let spec = LaunchSpec {
            program: request.program,
            args: request.args,
            working_dir: request.working_dir,
            env,
        };

        match self
            .launcher
            .launch(spec, run_id, self.events_tx.clone())
            .await
        {
            Ok(control) => {
                self.active = Some(control);
                self.core.spawned(run_id);
                Ok(run_id)
            }
            Err(e) => {
                self.core.start_failed(Instant::now(), &e);
                Err(e)
            }
        }
    }

    /// Move complete buffered output lines into the log.
    pub fn on_output_available(&mut self) {
        self.core.on_output_available(Instant::now());
        self.apply_effects();
    }

    /// The process of `run_id` exited on its own. Stale notifications are
    /// ignored and return `None`.
    pub fn on_process_exited(&mut self, run_id: RunId, exit_code: i32) -> Option<RunOutcome> {
        let outcome = self.core.process_exited(Instant::now(), run_id, exit_code);
        if outcome.is_some() {
            self.active = None;
        }
        self.apply_effects();
        outcome
    }

    /// Stop the active run and wait, bounded by the configured timeout, for
    /// the process to exit.
    ///
    /// A timeout returns `CancelTimeout`, which is fatal: the supervisor
    /// stays `Cancelling` and refuses new starts.
    pub async fn cancel(&mut self) -> Result<RunOutcome> {
        let run_id = self.core.begin_cancel(Instant::now())?;
        self.apply_effects();

        let mode = TerminationMode::for_platform(self.options.platform);
        let timeout = self.options.cancel_timeout;

        let exit_code = match self.active.take() {
            Some(control) => {
                info!(run_id, pid = ?control.pid(), ?mode, "stopping process");
                let reply = control.request_cancel(mode);
                match tokio::time::timeout(timeout, reply).await {
                    Ok(Ok(Ok(code))) => Some(code),
                    Ok(Ok(Err(e))) => {
                        warn!(run_id, error = %e, "could not collect exit status of cancelled process");
                        None
                    }
                    Ok(Err(_)) => {
                        debug!(run_id, "process finished before the cancel request arrived");
                        None
                    }
                    Err(_) => {
                        error!(run_id, ?timeout, "cancelled process did not exit in time");
                        self.core.cancel_timed_out(Instant::now(), timeout);
                        self.apply_effects();
                        return Err(CartmeshError::CancelTimeout { timeout });
                    }
                }
            }
            None => {
                warn!(run_id, "no process control for running run");
                None
            }
        };

        let outcome = self.core.cancel_completed(Instant::now(), exit_code);
        self.apply_effects();
        Ok(outcome)
    }

    /// Elapsed-time ticker fired.
    pub fn on_tick(&mut self, run_id: RunId) {
        self.core.tick(Instant::now(), run_id);
        self.apply_effects();
    }

    /// Handle a single event. Returns whether the event loop should keep
    /// going; only fatal errors are returned as `Err`.
    pub async fn handle_event(&mut self, event: SupervisorEvent) -> Result<bool> {
        match event {
            SupervisorEvent::StartRequested(request) => {
                if let Err(e) = self.start(request).await {
                    if e.is_fatal() {
                        return Err(e);
                    }
                    warn!(error = %e, "start request not honoured");
                }
            }
            SupervisorEvent::Output {
                run_id,
                stream,
                chunk,
            } => {
                self.core.ingest(run_id, stream, &chunk);
                self.on_output_available();
            }
            SupervisorEvent::ProcessExited { run_id, exit_code } => {
                self.on_process_exited(run_id, exit_code);
            }
            SupervisorEvent::CancelRequested => match self.cancel().await {
                Ok(_) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(error = %e, "cancel request not honoured"),
            },
            SupervisorEvent::Tick { run_id } => self.on_tick(run_id),
            SupervisorEvent::ShutdownRequested => {
                if self.core.state() == SupervisorState::Running {
                    info!("shutdown requested; cancelling active run");
                    self.cancel().await?;
                }
                return Ok(false);
            }
        }

        let finished = self.options.exit_when_idle
            && self.core.state() == SupervisorState::Idle
            && self.last_outcome.is_some();
        Ok(!finished)
    }

    /// Main event loop.
    ///
    /// Returns the most recent terminal outcome, if any run finished.
    pub async fn run(
        mut self,
        mut events_rx: mpsc::Receiver<SupervisorEvent>,
    ) -> Result<Option<RunOutcome>> {
        info!("supervisor started");

        while let Some(event) = events_rx.recv().await {
            debug!(?event, "supervisor received event");
            if !self.handle_event(event).await? {
                break;
            }
        }

        info!("supervisor exiting");
        Ok(self.last_outcome.take())
    }

    fn apply_effects(&mut self) {
        for effect in self.core.take_effects() {
            match effect {
                CoreEffect::LogCleared => self.observer.log_cleared(),
                CoreEffect::Log(entry) => self.observer.log_appended(&entry),
                CoreEffect::Timer(text) => self.observer.timer_updated(&text),
                CoreEffect::Affordances(a) => self.observer.affordances_changed(a),
                CoreEffect::ErrorLine(line) => self.observer.report_error(&line),
                CoreEffect::StartTicker(run_id) => {
                    self.ticker = Some(Ticker::spawn(
                        run_id,
                        self.options.tick_interval,
                        self.events_tx.clone(),
                    ));
                }
                CoreEffect::StopTicker => {
                    if let Some(ticker) = self.ticker.take() {
                        debug!(run_id = ticker.run_id(), "ticker stopped");
                    }
                }
                CoreEffect::Outcome(outcome) => {
                    self.observer.run_finished(&outcome);
                    self.last_outcome = Some(outcome);
                }
            }
        }
    }
}
