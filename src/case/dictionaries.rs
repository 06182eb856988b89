// src/case/dictionaries.rs

//! OpenFOAM-style input files for the two meshing utilities.
//!
//! Lengths come in as millimetres and are written in metres.

use std::fmt::Write as _;
use std::path::Path;

use super::params::Point3;

const MM_PER_M: f64 = 1000.0;

/// Values the dictionaries need, with defaults already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryInputs<'a> {
    /// Surface file relative to the case directory.
    pub surface_file: &'a str,
    /// Maximum cell size, mm.
    pub max_cell_size: f64,
    pub point_in_mesh: Point3,
    pub cells_between_levels: u32,
    pub edge_refinement: u32,
}

fn foam_header(object: &str) -> String {
    format!(
        "FoamFile\n{{\n    version     2.0;\n    format      ascii;\n    class       dictionary;\n    object      {object};\n}}\n\n"
    )
}

/// Stem of the surface file name, used as the region name.
fn surface_name(surface_file: &str) -> &str {
    Path::new(surface_file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("surface")
}

fn metres(mm: f64) -> f64 {
    mm / MM_PER_M
}

/// `system/meshDict` for cfMesh's `cartesianMesh`.
///
/// Each edge refinement level halves the boundary cell size.
pub fn cf_mesh_dict(inputs: &DictionaryInputs<'_>) -> String {
    let max_cell = metres(inputs.max_cell_size);
    let boundary_cell = max_cell / f64::from(2u32.saturating_pow(inputs.edge_refinement));

    let mut out = foam_header("meshDict");
    let _ = writeln!(out, "surfaceFile \"{}\";", inputs.surface_file);
    let _ = writeln!(out);
    let _ = writeln!(out, "maxCellSize {max_cell};");
    let _ = writeln!(out);
    let _ = writeln!(out, "boundaryCellSize {boundary_cell};");
    out
}

/// `system/snappyHexMeshDict` for `snappyHexMesh`.
pub fn snappy_hex_mesh_dict(inputs: &DictionaryInputs<'_>) -> String {
    let name = surface_name(inputs.surface_file);
    let file_name = Path::new(inputs.surface_file)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(inputs.surface_file);
    let p = inputs.point_in_mesh;

    let mut out = foam_header("snappyHexMeshDict");
    let _ = writeln!(out, "castellatedMesh true;");
    let _ = writeln!(out, "snap            true;");
    let _ = writeln!(out, "addLayers       false;");
    let _ = writeln!(out);
    let _ = writeln!(out, "geometry");
    let _ = writeln!(out, "{{");
    let _ = writeln!(out, "    {file_name}");
    let _ = writeln!(out, "    {{");
    let _ = writeln!(out, "        type triSurfaceMesh;");
    let _ = writeln!(out, "        name {name};");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
    let _ = writeln!(out, "castellatedMeshControls");
    let _ = writeln!(out, "{{");
    let _ = writeln!(out, "    maxLocalCells 100000;");
    let _ = writeln!(out, "    maxGlobalCells 2000000;");
    let _ = writeln!(out, "    minRefinementCells 0;");
    let _ = writeln!(out, "    nCellsBetweenLevels {};", inputs.cells_between_levels);
    let _ = writeln!(out, "    features");
    let _ = writeln!(out, "    (");
    let _ = writeln!(out, "        {{");
    let _ = writeln!(out, "            file \"{name}.eMesh\";");
    let _ = writeln!(out, "            level {};", inputs.edge_refinement);
    let _ = writeln!(out, "        }}");
    let _ = writeln!(out, "    );");
    let _ = writeln!(out, "    refinementSurfaces");
    let _ = writeln!(out, "    {{");
    let _ = writeln!(out, "        {name}");
    let _ = writeln!(out, "        {{");
    let _ = writeln!(out, "            level (0 0);");
    let _ = writeln!(out, "        }}");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "    resolveFeatureAngle 30;");
    let _ = writeln!(out, "    refinementRegions {{}}");
    let _ = writeln!(
        out,
        "    locationInMesh ({} {} {});",
        metres(p.x),
        metres(p.y),
        metres(p.z)
    );
    let _ = writeln!(out, "    allowFreeStandingZoneFaces true;");
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
    let _ = writeln!(out, "snapControls");
    let _ = writeln!(out, "{{");
    let _ = writeln!(out, "    nSmoothPatch 3;");
    let _ = writeln!(out, "    tolerance 2.0;");
    let _ = writeln!(out, "    nSolveIter 30;");
    let _ = writeln!(out, "    nRelaxIter 5;");
    let _ = writeln!(out, "    nFeatureSnapIter 10;");
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
    let _ = writeln!(out, "mergeTolerance 1e-6;");
    out
}

/// `Allmesh` driver script for cfMesh.
pub fn cf_mesh_allmesh() -> String {
    "#!/bin/sh\ncd \"${0%/*}\" || exit 1\n\ncartesianMesh || exit 1\n".to_string()
}

/// `Allmesh` driver script for snappyHexMesh. The background
/// `system/blockMeshDict` is supplied with the case surface.
pub fn snappy_allmesh(surface_file: &str) -> String {
    let name = surface_name(surface_file);
    format!(
        "#!/bin/sh\ncd \"${{0%/*}}\" || exit 1\n\nblockMesh || exit 1\nsurfaceFeatureEdges {surface_file} constant/triSurface/{name}.eMesh || exit 1\nsnappyHexMesh -overwrite || exit 1\n"
    )
}

/// ParaView Python script that opens the meshed case.
pub fn paraview_script(case_dir: &Path) -> String {
    let foam = case_dir.join("pv.foam");
    format!(
        "from paraview.simple import *\n\ncase = OpenFOAMReader(FileName=r'{}')\ncase.MeshRegions = ['internalMesh']\nShow(case)\nResetCamera()\nRender()\n",
        foam.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> DictionaryInputs<'static> {
        DictionaryInputs {
            surface_file: "constant/triSurface/part.stl",
            max_cell_size: 20.0,
            point_in_mesh: Point3::new(10.0, 0.0, -5.0),
            cells_between_levels: 4,
            edge_refinement: 2,
        }
    }

    #[test]
    fn cf_mesh_halves_boundary_size_per_level() {
        let dict = cf_mesh_dict(&inputs());
        assert!(dict.contains("object      meshDict;"));
        assert!(dict.contains("surfaceFile \"constant/triSurface/part.stl\";"));
        assert!(dict.contains("maxCellSize 0.02;"));
        assert!(dict.contains("boundaryCellSize 0.005;"));
    }

    #[test]
    fn snappy_dict_carries_seed_point_and_levels() {
        let dict = snappy_hex_mesh_dict(&inputs());
        assert!(dict.contains("part.stl"));
        assert!(dict.contains("nCellsBetweenLevels 4;"));
        assert!(dict.contains("level 2;"));
        assert!(dict.contains("locationInMesh (0.01 0 -0.005);"));
    }

    #[test]
    fn snappy_script_extracts_features_for_the_surface() {
        let script = snappy_allmesh("constant/triSurface/part.stl");
        assert!(script.contains("constant/triSurface/part.eMesh"));
        assert!(script.ends_with("snappyHexMesh -overwrite || exit 1\n"));
    }
}
