// tests/case_builder_fs.rs

use std::fs;

use cartmesh::case::{FoamCaseBuilder, MeshCaseBuilder, ViewerLauncher};
use cartmesh::errors::CartmeshError;
use cartmesh::fs::RealFileSystem;
use cartmesh::types::{MeshUtility, PlatformFamily};
use cartmesh_test_utils::{MeshParametersBuilder, seed_case_dir};

#[test]
fn snappy_case_is_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    seed_case_dir(dir.path());
    let params = MeshParametersBuilder::new()
        .cell_size(8.0)
        .point_in_mesh(0.5, 0.25, 0.1)
        .edge_refinement(1)
        .utility(MeshUtility::SnappyHexMesh)
        .build();

    let request = FoamCaseBuilder::new(RealFileSystem, dir.path())
        .platform(PlatformFamily::Unix)
        .prepare(&params)
        .unwrap();

    assert_eq!(request.working_dir, dir.path());
    assert_eq!(request.command_line(), "sh ./Allmesh");

    let dict = fs::read_to_string(dir.path().join("system/snappyHexMeshDict")).unwrap();
    assert!(dict.contains("level 1;"), "{dict}");
    let script = fs::read_to_string(dir.path().join("Allmesh")).unwrap();
    assert!(script.starts_with("#!/bin/sh"));
    assert!(script.contains("snappyHexMesh -overwrite"));
    let pv = fs::read_to_string(dir.path().join("pvScriptMesh.py")).unwrap();
    assert!(pv.contains("pv.foam"));
    assert!(dir.path().join("pv.foam").is_file());
}

#[test]
fn default_cell_size_applies_when_unset() {
    let dir = tempfile::tempdir().unwrap();
    seed_case_dir(dir.path());

    FoamCaseBuilder::new(RealFileSystem, dir.path())
        .default_cell_size(40.0)
        .prepare(&MeshParametersBuilder::new().build())
        .unwrap();

    let dict = fs::read_to_string(dir.path().join("system/meshDict")).unwrap();
    assert!(dict.contains("maxCellSize 0.04;"), "{dict}");
}

#[test]
fn custom_surface_location_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    seed_case_dir(dir.path());

    let err = FoamCaseBuilder::new(RealFileSystem, dir.path())
        .surface_file("constant/triSurface/other.stl")
        .prepare(&MeshParametersBuilder::new().build())
        .unwrap_err();

    assert!(matches!(err, CartmeshError::CaseBuild(ref msg) if msg.contains("other.stl")));
    assert!(!dir.path().join("Allmesh").exists());
}

#[test]
#[cfg(unix)]
fn viewer_is_found_in_search_path() {
    let bin = tempfile::tempdir().unwrap();
    let viewer_path = bin.path().join("paraview");
    fs::write(&viewer_path, "#!/bin/sh\n").unwrap();

    let viewer = ViewerLauncher::new(RealFileSystem, "paraview").search_path(bin.path());
    let (program, args) = viewer.command_for(std::path::Path::new("/cases/bracket")).unwrap();

    assert_eq!(program, viewer_path);
    assert_eq!(args, vec!["--script=/cases/bracket/pvScriptMesh.py"]);
}
