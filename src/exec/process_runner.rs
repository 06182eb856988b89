// src/exec/process_runner.rs

//! Per-run process runner task.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::supervisor::{OutputStream, RunId, SupervisorEvent};

use super::launcher::CancelRequest;
use super::termination::{signal_child, TerminationMode};

/// How long to wait for the pipes to close after the process exited.
/// Grandchildren that inherited the pipes can keep them open indefinitely.
const PIPE_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

const READ_CHUNK: usize = 8 * 1024;

/// Forward the child's output and report how it ended.
///
/// - Natural exit: wait until both pipes are drained, then send
///   `ProcessExited`, so every output event precedes the exit event.
/// - Cancel request: signal the process, wait for it, answer on the reply
///   channel and send **no** `ProcessExited`.
/// - Control dropped: kill the process.
pub async fn run_process(
    mut child: Child,
    run_id: RunId,
    events: mpsc::Sender<SupervisorEvent>,
    cancel_rx: oneshot::Receiver<CancelRequest>,
) {
    let readers = [
        child
            .stdout
            .take()
            .map(|pipe| spawn_reader(pipe, run_id, OutputStream::Stdout, events.clone())),
        child
            .stderr
            .take()
            .map(|pipe| spawn_reader(pipe, run_id, OutputStream::Stderr, events.clone())),
    ];

    tokio::select! {
        status = child.wait() => {
            let exit_code = match status {
                Ok(status) => exit_code_of(status),
                Err(e) => {
                    error!(run_id, error = %e, "waiting for process failed");
                    -1
                }
            };

            drain_readers(readers, run_id).await;

            info!(run_id, exit_code, "process exited");
            if events
                .send(SupervisorEvent::ProcessExited { run_id, exit_code })
                .await
                .is_err()
            {
                debug!(run_id, "supervisor gone; exit not delivered");
            }
        }

        cancel = cancel_rx => {
            match cancel {
                Ok(CancelRequest { mode, reply }) => {
                    info!(run_id, ?mode, "cancellation requested; stopping process");
                    let result = stop(&mut child, mode, run_id).await;

                    // Output after a cancel is discarded by the supervisor, and
                    // it is blocked on this reply, so don't wait on the pipes.
                    abort_readers(readers);
                    let _ = reply.send(result);
                }
                Err(_) => {
                    debug!(run_id, "process control dropped; killing process");
                    abort_readers(readers);
                    if let Err(e) = signal_child(&mut child, TerminationMode::Kill) {
                        warn!(run_id, error = %e, "failed to kill orphaned process");
                    }
                    let _ = child.wait().await;
                }
            }
        }
    }
}

async fn stop(child: &mut Child, mode: TerminationMode, run_id: RunId) -> std::io::Result<i32> {
    if let Err(e) = signal_child(child, mode) {
        warn!(run_id, ?mode, error = %e, "failed to signal process; killing instead");
        child.start_kill()?;
    }
    let status = child.wait().await?;
    Ok(exit_code_of(status))
}

fn spawn_reader<R>(
    mut pipe: R,
    run_id: RunId,
    stream: OutputStream,
    events: mpsc::Sender<SupervisorEvent>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            match pipe.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let event = SupervisorEvent::Output {
                        run_id,
                        stream,
                        chunk: buf[..n].to_vec(),
                    };
                    if events.send(event).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(run_id, ?stream, error = %e, "reading process output failed");
                    break;
                }
            }
        }
    })
}

async fn drain_readers(readers: [Option<JoinHandle<()>>; 2], run_id: RunId) {
    for mut reader in readers.into_iter().flatten() {
        if tokio::time::timeout(PIPE_DRAIN_TIMEOUT, &mut reader).await.is_err() {
            warn!(run_id, "output pipe still open after process exit; abandoning it");
            reader.abort();
        }
    }
}

fn abort_readers(readers: [Option<JoinHandle<()>>; 2]) {
    for reader in readers.into_iter().flatten() {
        reader.abort();
    }
}

/// Exit code, or `-1` when the process was ended by a signal.
fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
