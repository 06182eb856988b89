// src/case/params.rs

use serde::Deserialize;

use crate::types::{ElementDimension, MeshUtility};

/// A point in model coordinates (millimetres).
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Point3 {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Parameters of one meshing run, as edited by the user.
///
/// The supervisor treats these as opaque; only the case builder reads them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeshParameters {
    /// Maximum cell size in mm. `0` means "use the configured default".
    #[serde(default)]
    pub characteristic_length_max: f64,

    /// Seed point known to lie inside the volume to mesh.
    #[serde(default)]
    pub point_in_mesh: Point3,

    /// Number of buffer cells between two refinement levels.
    #[serde(default = "default_cells_between_levels")]
    pub cells_between_levels: u32,

    /// Number of refinement levels applied to feature edges.
    #[serde(default)]
    pub edge_refinement: u32,

    #[serde(default)]
    pub element_dimension: ElementDimension,

    #[serde(default)]
    pub mesh_utility: MeshUtility,
}

fn default_cells_between_levels() -> u32 {
    3
}

impl Default for MeshParameters {
    fn default() -> Self {
        Self {
            characteristic_length_max: 0.0,
            point_in_mesh: Point3::default(),
            cells_between_levels: default_cells_between_levels(),
            edge_refinement: 0,
            element_dimension: ElementDimension::default(),
            mesh_utility: MeshUtility::default(),
        }
    }
}
