// src/case/builder.rs

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::{CartmeshError, Result};
use crate::exec::EnvironmentOverlay;
use crate::fs::FileSystem;
use crate::supervisor::LaunchRequest;
use crate::types::{ElementDimension, MeshUtility, PlatformFamily};

use super::dictionaries::{self, DictionaryInputs};
use super::params::MeshParameters;

/// Name of the driver script written into every case.
pub const ALLMESH_SCRIPT: &str = "Allmesh";

/// Name of the ParaView script written next to it.
pub const PARAVIEW_SCRIPT: &str = "pvScriptMesh.py";

/// Writes a mesh case directory and says how to run it.
///
/// Called by the supervisor right before launching, so errors surface as a
/// failed start.
pub trait MeshCaseBuilder: Send + Sync {
    fn prepare(&self, params: &MeshParameters) -> Result<LaunchRequest>;
}

/// Builds an OpenFOAM-layout case for cfMesh or snappyHexMesh.
///
/// The surface file (and, for snappyHexMesh, the background
/// `system/blockMeshDict`) must already be in the case directory.
#[derive(Debug, Clone)]
pub struct FoamCaseBuilder<F: FileSystem> {
    fs: F,
    case_dir: PathBuf,
    surface_file: String,
    default_cell_size: f64,
    env_overlay: EnvironmentOverlay,
    platform: PlatformFamily,
}

impl<F: FileSystem> FoamCaseBuilder<F> {
    pub fn new(fs: F, case_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            case_dir: case_dir.into(),
            surface_file: "constant/triSurface/part.stl".to_string(),
            default_cell_size: 10.0,
            env_overlay: EnvironmentOverlay::default(),
            platform: PlatformFamily::current(),
        }
    }

    pub fn surface_file(mut self, surface_file: impl Into<String>) -> Self {
        self.surface_file = surface_file.into();
        self
    }

    /// Cell size (mm) used when the parameters ask for the default.
    pub fn default_cell_size(mut self, size: f64) -> Self {
        self.default_cell_size = size;
        self
    }

    pub fn env_overlay(mut self, overlay: EnvironmentOverlay) -> Self {
        self.env_overlay = overlay;
        self
    }

    pub fn platform(mut self, platform: PlatformFamily) -> Self {
        self.platform = platform;
        self
    }

    pub fn case_dir(&self) -> &Path {
        &self.case_dir
    }

    /// Resolve the maximum cell size: `0` selects the configured default.
    pub fn effective_cell_size(&self, params: &MeshParameters) -> f64 {
        if params.characteristic_length_max > 0.0 {
            params.characteristic_length_max
        } else {
            self.default_cell_size
        }
    }

    fn write(&self, relative: &str, contents: &str) -> Result<()> {
        let path = self.case_dir.join(relative);
        debug!(path = %path.display(), "writing case file");
        self.fs
            .write(&path, contents.as_bytes())
            .map_err(|e| CartmeshError::CaseBuild(format!("{e:#}")))
    }
}

impl<F: FileSystem> MeshCaseBuilder for FoamCaseBuilder<F> {
    fn prepare(&self, params: &MeshParameters) -> Result<LaunchRequest> {
        if params.element_dimension != ElementDimension::ThreeD {
            return Err(CartmeshError::CaseBuild(format!(
                "{} meshes are not supported; cut-cell meshing needs a 3D solid",
                params.element_dimension
            )));
        }

        let surface = self.case_dir.join(&self.surface_file);
        if !self.fs.is_file(&surface) {
            return Err(CartmeshError::CaseBuild(format!(
                "surface file {} not found",
                surface.display()
            )));
        }

        let max_cell_size = self.effective_cell_size(params);
        info!(
            case_dir = %self.case_dir.display(),
            utility = %params.mesh_utility,
            max_cell_size,
            "writing mesh case"
        );

        let inputs = DictionaryInputs {
            surface_file: &self.surface_file,
            max_cell_size,
            point_in_mesh: params.point_in_mesh,
            cells_between_levels: params.cells_between_levels,
            edge_refinement: params.edge_refinement,
        };

        let (dictionary, script) = match params.mesh_utility {
            MeshUtility::CfMesh => (
                dictionaries::cf_mesh_dict(&inputs),
                dictionaries::cf_mesh_allmesh(),
            ),
            MeshUtility::SnappyHexMesh => (
                dictionaries::snappy_hex_mesh_dict(&inputs),
                dictionaries::snappy_allmesh(&self.surface_file),
            ),
        };

        self.write(
            &format!("system/{}", params.mesh_utility.dictionary_name()),
            &dictionary,
        )?;
        self.write(ALLMESH_SCRIPT, &script)?;
        self.write(PARAVIEW_SCRIPT, &dictionaries::paraview_script(&self.case_dir))?;
        self.write("pv.foam", "")?;

        let (program, args) = run_command(self.platform, ALLMESH_SCRIPT);
        Ok(LaunchRequest::new(program, &self.case_dir)
            .args(args)
            .env_overlay(self.env_overlay.clone()))
    }
}

/// Command that runs a shell script from the case directory.
///
/// The script is handed to the shell as an argument, so it does not need
/// the executable bit.
pub fn run_command(platform: PlatformFamily, script: &str) -> (String, Vec<String>) {
    match platform {
        PlatformFamily::Windows => (
            "cmd".to_string(),
            vec!["/C".to_string(), "bash".to_string(), format!("./{script}")],
        ),
        PlatformFamily::Unix => ("sh".to_string(), vec![format!("./{script}")]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::params::Point3;
    use crate::fs::mock::MockFileSystem;

    fn builder(fs: &MockFileSystem) -> FoamCaseBuilder<MockFileSystem> {
        FoamCaseBuilder::new(fs.clone(), "/tmp/meshCase")
            .default_cell_size(25.0)
            .platform(PlatformFamily::Unix)
    }

    fn fs_with_surface() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/tmp/meshCase/constant/triSurface/part.stl", "solid part\nendsolid part\n");
        fs
    }

    #[test]
    fn cf_mesh_case_is_written_and_runnable() {
        let fs = fs_with_surface();
        let params = MeshParameters::default();

        let request = builder(&fs).prepare(&params).unwrap();

        assert_eq!(request.program, "sh");
        assert_eq!(request.args, vec!["./Allmesh"]);
        assert_eq!(request.working_dir, PathBuf::from("/tmp/meshCase"));

        let dict = fs.contents("/tmp/meshCase/system/meshDict").unwrap();
        assert!(dict.contains("maxCellSize 0.025;"), "{dict}");
        let script = fs.contents("/tmp/meshCase/Allmesh").unwrap();
        assert!(script.contains("cartesianMesh"));
        assert!(fs.is_file(Path::new("/tmp/meshCase/pvScriptMesh.py")));
    }

    #[test]
    fn snappy_case_uses_explicit_cell_size_and_seed() {
        let fs = fs_with_surface();
        let params = MeshParameters {
            characteristic_length_max: 5.0,
            point_in_mesh: Point3::new(1.0, 2.0, 3.0),
            mesh_utility: MeshUtility::SnappyHexMesh,
            ..MeshParameters::default()
        };

        builder(&fs).prepare(&params).unwrap();

        let dict = fs.contents("/tmp/meshCase/system/snappyHexMeshDict").unwrap();
        assert!(dict.contains("locationInMesh (0.001 0.002 0.003);"), "{dict}");
        assert!(fs.contents("/tmp/meshCase/system/meshDict").is_none());
    }

    #[test]
    fn missing_surface_is_a_case_error() {
        let fs = MockFileSystem::new();
        let err = builder(&fs).prepare(&MeshParameters::default()).unwrap_err();
        assert!(matches!(err, CartmeshError::CaseBuild(ref msg) if msg.contains("part.stl")));
    }

    #[test]
    fn two_dimensional_meshes_are_rejected() {
        let fs = fs_with_surface();
        let params = MeshParameters {
            element_dimension: ElementDimension::TwoD,
            ..MeshParameters::default()
        };
        assert!(matches!(
            builder(&fs).prepare(&params),
            Err(CartmeshError::CaseBuild(_))
        ));
    }

    #[test]
    fn windows_runs_script_through_cmd() {
        let (program, args) = run_command(PlatformFamily::Windows, "Allmesh");
        assert_eq!(program, "cmd");
        assert_eq!(args, vec!["/C", "bash", "./Allmesh"]);
    }
}
