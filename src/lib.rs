// src/lib.rs

pub mod case;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod supervisor;
pub mod types;

use anyhow::{Context, Result, anyhow};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::case::{FoamCaseBuilder, PARAVIEW_SCRIPT, ViewerLauncher};
use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_or_default};
use crate::errors::CartmeshError;
use crate::exec::{EnvironmentOverlay, TokioLauncher};
use crate::fs::RealFileSystem;
use crate::supervisor::{
    ConsoleObserver, LaunchRequest, RunOutcome, Supervisor, SupervisorEvent, SupervisorOptions,
};
use crate::types::PlatformFamily;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - mesh case writing
/// - the supervisor and its process launcher
/// - Ctrl-C handling (cancels the active run)
/// - the optional viewer launch
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = effective_config(&args)?;

    let mut overlay = cfg.env_overlay();
    overlay.extend(&EnvironmentOverlay::parse_entries(&args.env)?);

    if args.dry_run {
        print_dry_run(&cfg, &overlay, &args.command);
        return Ok(());
    }

    let options = SupervisorOptions {
        cancel_timeout: cfg.run.cancel_timeout(),
        tick_interval: cfg.run.tick_interval(),
        platform: PlatformFamily::current(),
        job_label: cfg.run.job_label.clone(),
        completion_hint: completion_hint(&cfg, &args),
        exit_when_idle: true,
    };

    let (tx, rx) = mpsc::channel::<SupervisorEvent>(256);
    let mut supervisor = Supervisor::new(
        TokioLauncher,
        Box::new(ConsoleObserver),
        options,
        tx.clone(),
    );

    // Ctrl-C → cancel the active run.
    {
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            let _ = tx.send(SupervisorEvent::CancelRequested).await;
        });
    }
    drop(tx);

    if args.command.is_empty() {
        let builder = case_builder(&cfg, overlay);
        supervisor.start_case(&builder, &cfg.mesh).await?;
    } else {
        let working_dir = std::env::current_dir().context("resolving working directory")?;
        let request = LaunchRequest::new(args.command[0].clone(), working_dir)
            .args(args.command[1..].to_vec())
            .env_overlay(overlay);
        supervisor.start(request).await?;
    }

    let outcome = supervisor.run(rx).await?;
    debug!(?outcome, "run loop finished");

    match outcome {
        Some(RunOutcome::Success) => {
            if args.view {
                let viewer = ViewerLauncher::new(RealFileSystem, cfg.viewer.command.clone());
                let pid = viewer.launch(&cfg.run.case_dir)?;
                info!(?pid, "viewer started");
            }
            Ok(())
        }
        Some(RunOutcome::Failed(exit_code)) => Err(CartmeshError::Runtime { exit_code }.into()),
        Some(RunOutcome::Cancelled) => Err(anyhow!("run cancelled")),
        Some(RunOutcome::StartFailed(reason)) => Err(anyhow!(reason)),
        None => Ok(()),
    }
}

/// Config file (or defaults) with the CLI overrides applied.
fn effective_config(args: &CliArgs) -> Result<ConfigFile> {
    let mut cfg = load_or_default(args.config.as_deref())?;

    if let Some(ref case_dir) = args.case_dir {
        cfg.run.case_dir = case_dir.clone();
    }
    if let Some(utility) = args.utility {
        cfg.mesh.mesh_utility = utility;
    }
    if let Some(secs) = args.cancel_timeout {
        if secs == 0 {
            return Err(
                CartmeshError::ConfigError("--cancel-timeout must be at least 1".into()).into(),
            );
        }
        cfg.run.cancel_timeout_secs = secs;
    }

    Ok(cfg)
}

/// Where to look at a freshly meshed case, unless `--view` opens it anyway.
fn completion_hint(cfg: &ConfigFile, args: &CliArgs) -> Option<String> {
    if !args.command.is_empty() || args.view {
        return None;
    }
    Some(format!(
        "View the mesh in ParaView: {}",
        cfg.run.case_dir.join(PARAVIEW_SCRIPT).display()
    ))
}

fn case_builder(cfg: &ConfigFile, overlay: EnvironmentOverlay) -> FoamCaseBuilder<RealFileSystem> {
    FoamCaseBuilder::new(RealFileSystem, cfg.run.case_dir.clone())
        .surface_file(cfg.run.surface_file.clone())
        .default_cell_size(cfg.run.default_cell_size)
        .env_overlay(overlay)
}

/// Simple dry-run output: print the effective settings and what would run.
fn print_dry_run(cfg: &ConfigFile, overlay: &EnvironmentOverlay, command: &[String]) {
    println!("cartmesh dry-run");
    println!("  run.case_dir = {}", cfg.run.case_dir.display());
    println!("  run.cancel_timeout = {:?}", cfg.run.cancel_timeout());
    println!("  run.tick_interval = {:?}", cfg.run.tick_interval());
    println!();

    if command.is_empty() {
        let builder = FoamCaseBuilder::new(RealFileSystem, cfg.run.case_dir.clone())
            .default_cell_size(cfg.run.default_cell_size);
        let mesh = &cfg.mesh;
        println!("mesh:");
        println!("  utility: {}", mesh.mesh_utility);
        println!("  max cell size: {} mm", builder.effective_cell_size(mesh));
        println!(
            "  point in mesh: ({}, {}, {})",
            mesh.point_in_mesh.x, mesh.point_in_mesh.y, mesh.point_in_mesh.z
        );
        println!("  cells between levels: {}", mesh.cells_between_levels);
        println!("  edge refinement: {}", mesh.edge_refinement);
        println!("  surface: {}", cfg.run.surface_file);
        println!(
            "  files: system/{}, {}, {}",
            mesh.mesh_utility.dictionary_name(),
            case::ALLMESH_SCRIPT,
            case::PARAVIEW_SCRIPT
        );
        let (program, args) = case::run_command(PlatformFamily::current(), case::ALLMESH_SCRIPT);
        println!("  cmd: {program} {}", args.join(" "));
    } else {
        println!("cmd: {}", command.join(" "));
    }

    if !overlay.is_empty() {
        println!();
        println!("env:");
        for (key, value) in overlay.entries() {
            println!("  {key}={value}");
        }
    }

    debug!("dry-run complete (no execution)");
}
