// src/errors.rs

//! Crate-wide error type and result alias.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CartmeshError {
    /// The subprocess could not be spawned; `reason` is the OS-reported cause.
    #[error("Error starting process: {reason}")]
    Start { reason: String },

    /// The subprocess ran but exited with a non-zero code.
    #[error("Process exited with code {exit_code}")]
    Runtime { exit_code: i32 },

    /// A cancelled process did not exit in time. Fatal for the supervisor.
    #[error("Process did not exit within {timeout:?} after cancellation")]
    CancelTimeout { timeout: Duration },

    /// Malformed environment overlay entry, detected before spawning.
    #[error("Invalid environment overlay: {0}")]
    EnvironmentBuild(String),

    #[error("A process is already running")]
    AlreadyRunning,

    #[error("No process is running")]
    NotRunning,

    #[error("Mesh case error: {0}")]
    CaseBuild(String),

    #[error("Viewer executable not found: {0}")]
    ViewerNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CartmeshError {
    /// Whether the supervisor can keep accepting work after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CartmeshError::CancelTimeout { .. })
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CartmeshError>;
