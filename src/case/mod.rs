// src/case/mod.rs

//! Mesh case preparation and result viewing.
//!
//! - [`params`] holds the user-facing mesh parameters.
//! - [`builder`] writes the case directory and produces the launch request
//!   the supervisor runs.
//! - [`dictionaries`] renders the utility-specific input files.
//! - [`viewer`] opens a finished case in ParaView.

pub mod builder;
pub mod dictionaries;
pub mod params;
pub mod viewer;

pub use builder::{run_command, FoamCaseBuilder, MeshCaseBuilder, ALLMESH_SCRIPT, PARAVIEW_SCRIPT};
pub use params::{MeshParameters, Point3};
pub use viewer::ViewerLauncher;
