// src/exec/termination.rs

//! How a cancelled process is stopped on each platform family.

use std::io;

use tokio::process::Child;
use tracing::debug;

use crate::types::PlatformFamily;

/// Signal sent to a process on cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationMode {
    /// Immediate forceful kill.
    Kill,
    /// Graceful terminate request (SIGTERM); the process may clean up.
    Terminate,
}

impl TerminationMode {
    /// Capability lookup: Windows has no graceful terminate for console
    /// processes, so it gets a kill; every other family gets SIGTERM.
    pub fn for_platform(platform: PlatformFamily) -> Self {
        match platform {
            PlatformFamily::Windows => TerminationMode::Kill,
            PlatformFamily::Unix => TerminationMode::Terminate,
        }
    }
}

/// Send the termination signal to the child's process tree without waiting
/// for it to exit.
///
/// On unix the child leads its own process group (see `TokioLauncher`), so
/// the signal goes to the group and reaches the utilities the run script
/// started.
pub fn signal_child(child: &mut Child, mode: TerminationMode) -> io::Result<()> {
    match mode {
        TerminationMode::Kill => kill_tree(child),
        TerminationMode::Terminate => terminate(child),
    }
}

#[cfg(unix)]
fn terminate(child: &mut Child) -> io::Result<()> {
    signal_group(child, libc::SIGTERM)
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) -> io::Result<()> {
    signal_group(child, libc::SIGKILL)
}

#[cfg(unix)]
fn signal_group(child: &Child, signal: libc::c_int) -> io::Result<()> {
    let Some(pid) = child.id() else {
        // Already reaped; nothing left to signal.
        return Ok(());
    };

    debug!(pgid = pid, signal, "signalling process group");
    let rc = unsafe { libc::kill(-(pid as libc::pid_t), signal) };
    if rc == 0 {
        Ok(())
    } else {
        let err = io::Error::last_os_error();
        // ESRCH: the whole group exited between id() and kill().
        if err.raw_os_error() == Some(libc::ESRCH) {
            Ok(())
        } else {
            Err(err)
        }
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) -> io::Result<()> {
    debug!(pid = ?child.id(), "no graceful terminate on this platform; killing");
    kill_tree(child)
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) -> io::Result<()> {
    if let Some(pid) = child.id() {
        debug!(pid, "killing process tree");
        let status = std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status();
        if let Err(e) = status {
            debug!(pid, error = %e, "taskkill unavailable; killing the child only");
        }
    }
    child.start_kill()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_kills_everything_else_terminates() {
        assert_eq!(
            TerminationMode::for_platform(PlatformFamily::Windows),
            TerminationMode::Kill
        );
        assert_eq!(
            TerminationMode::for_platform(PlatformFamily::Unix),
            TerminationMode::Terminate
        );
    }
}
