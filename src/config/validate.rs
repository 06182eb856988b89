// src/config/validate.rs

use std::collections::BTreeMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{CartmeshError, Result};
use crate::exec::EnvironmentOverlay;
use crate::types::ElementDimension;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::CartmeshError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.mesh, raw.run, raw.env, raw.viewer))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_mesh(cfg)?;
    validate_run(cfg)?;
    validate_env(cfg)?;
    validate_viewer(cfg)?;
    Ok(())
}

fn validate_mesh(cfg: &RawConfigFile) -> Result<()> {
    let mesh = &cfg.mesh;

    if !mesh.characteristic_length_max.is_finite() || mesh.characteristic_length_max < 0.0 {
        return Err(CartmeshError::ConfigError(format!(
            "[mesh].characteristic_length_max must be >= 0 (got {})",
            mesh.characteristic_length_max
        )));
    }

    if !mesh.point_in_mesh.is_finite() {
        return Err(CartmeshError::ConfigError(
            "[mesh].point_in_mesh must have finite coordinates".to_string(),
        ));
    }

    if mesh.cells_between_levels == 0 {
        return Err(CartmeshError::ConfigError(
            "[mesh].cells_between_levels must be >= 1 (got 0)".to_string(),
        ));
    }

    if mesh.element_dimension != ElementDimension::ThreeD {
        return Err(CartmeshError::ConfigError(format!(
            "[mesh].element_dimension must be \"3D\" (got \"{}\")",
            mesh.element_dimension
        )));
    }

    Ok(())
}

fn validate_run(cfg: &RawConfigFile) -> Result<()> {
    let run = &cfg.run;

    if !run.default_cell_size.is_finite() || run.default_cell_size <= 0.0 {
        return Err(CartmeshError::ConfigError(format!(
            "[run].default_cell_size must be > 0 (got {})",
            run.default_cell_size
        )));
    }
    if run.cancel_timeout_secs == 0 {
        return Err(CartmeshError::ConfigError(
            "[run].cancel_timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    if run.tick_interval_ms == 0 {
        return Err(CartmeshError::ConfigError(
            "[run].tick_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if run.surface_file.trim().is_empty() {
        return Err(CartmeshError::ConfigError(
            "[run].surface_file must not be empty".to_string(),
        ));
    }
    if run.job_label.trim().is_empty() {
        return Err(CartmeshError::ConfigError(
            "[run].job_label must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_env(cfg: &RawConfigFile) -> Result<()> {
    let overlay = cfg
        .env
        .iter()
        .fold(EnvironmentOverlay::new(), |o, (k, v)| o.with(k, v));

    // Same checks the supervisor runs before spawning, surfaced at load time.
    overlay
        .build(&BTreeMap::<String, String>::new())
        .map(|_| ())
        .map_err(|e| CartmeshError::ConfigError(format!("[env]: {e}")))
}

fn validate_viewer(cfg: &RawConfigFile) -> Result<()> {
    if cfg.viewer.command.trim().is_empty() {
        return Err(CartmeshError::ConfigError(
            "[viewer].command must not be empty".to_string(),
        ));
    }
    Ok(())
}
