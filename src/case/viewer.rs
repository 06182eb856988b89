// src/case/viewer.rs

//! Launching the external results viewer (ParaView).

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::info;

use crate::errors::{CartmeshError, Result};
use crate::fs::FileSystem;

use super::builder::PARAVIEW_SCRIPT;

/// Resolves and starts the viewer for a finished case.
#[derive(Debug, Clone)]
pub struct ViewerLauncher<F: FileSystem> {
    fs: F,
    command: String,
    search_path: Option<OsString>,
}

impl<F: FileSystem> ViewerLauncher<F> {
    /// `command` is either a bare name looked up on `PATH` or a path.
    pub fn new(fs: F, command: impl Into<String>) -> Self {
        Self {
            fs,
            command: command.into(),
            search_path: std::env::var_os("PATH"),
        }
    }

    /// Override the `PATH` value used for lookup.
    pub fn search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    /// Locate the viewer executable.
    pub fn resolve(&self) -> Result<PathBuf> {
        let command = Path::new(&self.command);
        if command.components().count() > 1 {
            return if self.fs.is_file(command) {
                Ok(command.to_path_buf())
            } else {
                Err(CartmeshError::ViewerNotFound(self.command.clone()))
            };
        }

        let candidates: Vec<String> = if cfg!(windows) {
            vec![format!("{}.exe", self.command), self.command.clone()]
        } else {
            vec![self.command.clone()]
        };

        self.search_path
            .iter()
            .flat_map(std::env::split_paths)
            .flat_map(|dir| candidates.iter().map(move |c| dir.join(c)))
            .find(|candidate| self.fs.is_file(candidate))
            .ok_or_else(|| {
                CartmeshError::ViewerNotFound(format!("{} (not in PATH)", self.command))
            })
    }

    /// Program and arguments that open `case_dir` in the viewer.
    pub fn command_for(&self, case_dir: &Path) -> Result<(PathBuf, Vec<String>)> {
        let program = self.resolve()?;
        let script = case_dir.join(PARAVIEW_SCRIPT);
        Ok((program, vec![format!("--script={}", script.display())]))
    }

    /// Start the viewer detached from the supervisor. Returns its pid.
    pub fn launch(&self, case_dir: &Path) -> Result<Option<u32>> {
        let (program, args) = self.command_for(case_dir)?;
        info!(program = %program.display(), ?args, "opening viewer");

        let child = Command::new(&program)
            .args(&args)
            .current_dir(case_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false)
            .spawn()
            .map_err(|e| CartmeshError::Start {
                reason: format!("{}: {e}", program.display()),
            })?;

        Ok(child.id())
    }
}
