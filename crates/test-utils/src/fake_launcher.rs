use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use cartmesh::errors::{CartmeshError, Result};
use cartmesh::exec::{CancelRequest, LaunchSpec, ProcessControl, ProcessLauncher, TerminationMode};
use cartmesh::supervisor::{OutputStream, RunId, SupervisorEvent};

#[derive(Debug, Clone)]
enum Ending {
    Exit(i32),
    /// Wait for a cancel request, then answer with `exit_code` after `delay`.
    AwaitCancel { exit_code: i32, delay: Duration },
    /// Take the cancel request and never answer it.
    IgnoreCancel,
    SpawnError(String),
}

/// Script for one fake run: some output, then an ending.
#[derive(Debug, Clone)]
pub struct FakeRun {
    output: Vec<(OutputStream, Vec<u8>)>,
    ending: Ending,
}

impl FakeRun {
    /// Run that exits on its own with `code` after its output.
    pub fn exits(code: i32) -> Self {
        Self {
            output: Vec::new(),
            ending: Ending::Exit(code),
        }
    }

    /// Run that keeps going until cancelled; it then reports `-1`, like a
    /// process ended by a signal.
    pub fn until_cancelled() -> Self {
        Self {
            output: Vec::new(),
            ending: Ending::AwaitCancel {
                exit_code: -1,
                delay: Duration::ZERO,
            },
        }
    }

    /// Run that needs `delay` to go away after a cancel request.
    pub fn slow_to_stop(delay: Duration) -> Self {
        Self {
            output: Vec::new(),
            ending: Ending::AwaitCancel { exit_code: -1, delay },
        }
    }

    /// Run that never exits, even when cancelled.
    pub fn stuck() -> Self {
        Self {
            output: Vec::new(),
            ending: Ending::IgnoreCancel,
        }
    }

    /// Launch fails like a missing executable.
    pub fn spawn_error(reason: &str) -> Self {
        Self {
            output: Vec::new(),
            ending: Ending::SpawnError(reason.to_string()),
        }
    }

    /// Raw stdout chunk; it need not end with a newline.
    pub fn stdout(mut self, chunk: impl AsRef<[u8]>) -> Self {
        self.output
            .push((OutputStream::Stdout, chunk.as_ref().to_vec()));
        self
    }

    pub fn stderr(mut self, chunk: impl AsRef<[u8]>) -> Self {
        self.output
            .push((OutputStream::Stderr, chunk.as_ref().to_vec()));
        self
    }
}

/// What the fake launcher saw.
#[derive(Debug, Default)]
pub struct LaunchRecord {
    pub launches: Vec<(RunId, LaunchSpec)>,
    pub cancels: Vec<(RunId, TerminationMode)>,
}

/// A fake launcher that:
/// - records every launch spec and cancel mode
/// - plays the scripted [`FakeRun`]s in order, one per launch
/// - falls back to a clean exit once the script is used up.
pub struct FakeLauncher {
    runs: VecDeque<FakeRun>,
    record: Arc<Mutex<LaunchRecord>>,
}

impl FakeLauncher {
    pub fn new(runs: impl IntoIterator<Item = FakeRun>) -> Self {
        Self {
            runs: runs.into_iter().collect(),
            record: Arc::default(),
        }
    }

    pub fn record(&self) -> Arc<Mutex<LaunchRecord>> {
        Arc::clone(&self.record)
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(
        &mut self,
        spec: LaunchSpec,
        run_id: RunId,
        events: mpsc::Sender<SupervisorEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessControl>> + Send + '_>> {
        let run = self.runs.pop_front().unwrap_or_else(|| FakeRun::exits(0));
        let record = Arc::clone(&self.record);

        Box::pin(async move {
            if let Ending::SpawnError(ref reason) = run.ending {
                return Err(CartmeshError::Start {
                    reason: format!("{}: {reason}", spec.program),
                });
            }

            record.lock().unwrap().launches.push((run_id, spec));

            let (cancel_tx, cancel_rx) = oneshot::channel::<CancelRequest>();
            tokio::spawn(play(run, run_id, events, cancel_rx, record));

            Ok(ProcessControl::new(Some(4000 + run_id as u32), cancel_tx))
        })
    }
}

async fn play(
    run: FakeRun,
    run_id: RunId,
    events: mpsc::Sender<SupervisorEvent>,
    cancel_rx: oneshot::Receiver<CancelRequest>,
    record: Arc<Mutex<LaunchRecord>>,
) {
    for (stream, chunk) in run.output {
        let _ = events
            .send(SupervisorEvent::Output {
                run_id,
                stream,
                chunk,
            })
            .await;
    }

    let (exit_code, delay) = match run.ending {
        Ending::Exit(exit_code) => {
            let _ = events
                .send(SupervisorEvent::ProcessExited { run_id, exit_code })
                .await;
            return;
        }
        Ending::AwaitCancel { exit_code, delay } => (exit_code, delay),
        Ending::IgnoreCancel => (0, Duration::ZERO),
        Ending::SpawnError(_) => return,
    };

    let Ok(CancelRequest { mode, reply }) = cancel_rx.await else {
        return;
    };
    record.lock().unwrap().cancels.push((run_id, mode));

    if matches!(run.ending, Ending::IgnoreCancel) {
        // Keep the reply sender alive so the supervisor sees no answer.
        let _reply = reply;
        std::future::pending::<()>().await;
        return;
    }

    tokio::time::sleep(delay).await;
    let _ = reply.send(Ok(exit_code));
}
