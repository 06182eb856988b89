// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the meshing command with
//! `tokio::process::Command` and reporting back to the supervisor via
//! `SupervisorEvent`s.
//!
//! - [`launcher`] provides the `ProcessLauncher` trait and the production
//!   `TokioLauncher`, which tests can replace with a fake implementation.
//! - [`process_runner`] owns one running child: output forwarding, exit
//!   reporting and cancellation.
//! - [`termination`] maps the platform family to kill or terminate.
//! - [`environment`] builds the effective environment from the inherited
//!   one plus an overlay.

pub mod environment;
pub mod launcher;
pub mod process_runner;
pub mod termination;

pub use environment::{Environment, EnvironmentOverlay, HostEnvironment, SystemEnvironment};
pub use launcher::{CancelRequest, LaunchSpec, ProcessControl, ProcessLauncher, TokioLauncher};
pub use termination::TerminationMode;
