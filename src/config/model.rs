// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::case::MeshParameters;
use crate::exec::EnvironmentOverlay;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [mesh]
/// characteristic_length_max = 20.0
/// point_in_mesh = { x = 10.0, y = 0.0, z = 5.0 }
/// cells_between_levels = 3
/// edge_refinement = 1
/// mesh_utility = "snappyHexMesh"
///
/// [run]
/// case_dir = "/tmp/meshCase"
/// cancel_timeout_secs = 10
///
/// [env]
/// WM_PROJECT_DIR = "/opt/openfoam"
///
/// [viewer]
/// command = "paraview"
/// ```
///
/// All sections are optional and have reasonable defaults. This is the raw
/// shape; [`ConfigFile`] is the validated form.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub mesh: MeshParameters,

    #[serde(default)]
    pub run: RunSection,

    /// Environment overlay for the meshing process, from `[env]`.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub viewer: ViewerSection,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub mesh: MeshParameters,
    pub run: RunSection,
    pub env: BTreeMap<String, String>,
    pub viewer: ViewerSection,
}

impl ConfigFile {
    /// Used by the `TryFrom` impl in `validate.rs` after validation.
    pub(crate) fn new_unchecked(
        mesh: MeshParameters,
        run: RunSection,
        env: BTreeMap<String, String>,
        viewer: ViewerSection,
    ) -> Self {
        Self {
            mesh,
            run,
            env,
            viewer,
        }
    }

    pub fn env_overlay(&self) -> EnvironmentOverlay {
        self.env
            .iter()
            .fold(EnvironmentOverlay::new(), |overlay, (k, v)| overlay.with(k, v))
    }
}

/// `[run]` section: where and how the meshing process runs.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    /// Mesh case directory. Defaults to `<tmp>/meshCase`.
    #[serde(default = "default_case_dir")]
    pub case_dir: PathBuf,

    /// Surface file, relative to the case directory.
    #[serde(default = "default_surface_file")]
    pub surface_file: String,

    /// Cell size (mm) used when `mesh.characteristic_length_max` is 0.
    #[serde(default = "default_cell_size")]
    pub default_cell_size: f64,

    /// Upper bound on waiting for a cancelled process to exit.
    #[serde(default = "default_cancel_timeout_secs")]
    pub cancel_timeout_secs: u64,

    /// Period of the elapsed-time display.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Prefix of lifecycle log messages.
    #[serde(default = "default_job_label")]
    pub job_label: String,
}

fn default_case_dir() -> PathBuf {
    std::env::temp_dir().join("meshCase")
}

fn default_surface_file() -> String {
    "constant/triSurface/part.stl".to_string()
}

fn default_cell_size() -> f64 {
    10.0
}

fn default_cancel_timeout_secs() -> u64 {
    10
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_job_label() -> String {
    "Meshing".to_string()
}

impl RunSection {
    pub fn cancel_timeout(&self) -> Duration {
        Duration::from_secs(self.cancel_timeout_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            case_dir: default_case_dir(),
            surface_file: default_surface_file(),
            default_cell_size: default_cell_size(),
            cancel_timeout_secs: default_cancel_timeout_secs(),
            tick_interval_ms: default_tick_interval_ms(),
            job_label: default_job_label(),
        }
    }
}

/// `[viewer]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewerSection {
    /// Viewer executable: a name looked up on `PATH`, or a path.
    #[serde(default = "default_viewer_command")]
    pub command: String,
}

fn default_viewer_command() -> String {
    "paraview".to_string()
}

impl Default for ViewerSection {
    fn default() -> Self {
        Self {
            command: default_viewer_command(),
        }
    }
}
