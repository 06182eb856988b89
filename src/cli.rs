// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::MeshUtility;

/// Command-line arguments for `cartmesh`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cartmesh",
    version,
    about = "Write a cut-cell Cartesian mesh case and supervise the meshing run.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Cartmesh.toml` in the current working directory if it
    /// exists, otherwise built-in defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Mesh case directory (overrides `[run].case_dir`).
    #[arg(long, value_name = "DIR")]
    pub case_dir: Option<PathBuf>,

    /// Meshing utility (overrides `[mesh].mesh_utility`).
    #[arg(long, value_name = "NAME", value_parser = parse_utility)]
    pub utility: Option<MeshUtility>,

    /// Extra environment variable for the meshing process, `KEY=VALUE`.
    /// Repeatable; later values win.
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Seconds to wait for a cancelled process to exit.
    #[arg(long, value_name = "SECS")]
    pub cancel_timeout: Option<u64>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CARTMESH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the config and print what would run, without writing or
    /// executing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Open the result in the viewer after a successful run.
    #[arg(long)]
    pub view: bool,

    /// Run this command instead of the generated mesh case.
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_utility(s: &str) -> Result<MeshUtility, String> {
    s.parse()
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides_and_trailing_command() {
        let args = CliArgs::try_parse_from([
            "cartmesh",
            "--utility",
            "snappyHexMesh",
            "--env",
            "A=1",
            "--env",
            "B=2",
            "--",
            "sh",
            "-c",
            "echo hi",
        ])
        .unwrap();

        assert_eq!(args.utility, Some(MeshUtility::SnappyHexMesh));
        assert_eq!(args.env, vec!["A=1", "B=2"]);
        assert_eq!(args.command, vec!["sh", "-c", "echo hi"]);
    }

    #[test]
    fn rejects_unknown_utility() {
        assert!(CliArgs::try_parse_from(["cartmesh", "--utility", "gmsh"]).is_err());
    }
}
