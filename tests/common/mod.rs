#![allow(dead_code)]

use std::io::Write;

use tempfile::NamedTempFile;

pub use cartmesh_test_utils::{init_tracing, with_timeout};

/// Write `contents` to a temporary `.toml` file.
pub fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    write!(file, "{contents}").unwrap();
    file
}
