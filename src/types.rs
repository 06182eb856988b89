use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// External meshing utility that consumes the mesh case directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum MeshUtility {
    #[serde(rename = "cfMesh")]
    CfMesh,
    #[serde(rename = "snappyHexMesh")]
    SnappyHexMesh,
}

impl MeshUtility {
    pub fn as_str(self) -> &'static str {
        match self {
            MeshUtility::CfMesh => "cfMesh",
            MeshUtility::SnappyHexMesh => "snappyHexMesh",
        }
    }

    /// Name of the dictionary under `system/` the utility reads.
    pub fn dictionary_name(self) -> &'static str {
        match self {
            MeshUtility::CfMesh => "meshDict",
            MeshUtility::SnappyHexMesh => "snappyHexMeshDict",
        }
    }
}

impl Default for MeshUtility {
    fn default() -> Self {
        MeshUtility::CfMesh
    }
}

impl fmt::Display for MeshUtility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeshUtility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cfmesh" => Ok(MeshUtility::CfMesh),
            "snappyhexmesh" => Ok(MeshUtility::SnappyHexMesh),
            other => Err(format!(
                "invalid mesh utility: {other} (expected \"cfMesh\" or \"snappyHexMesh\")"
            )),
        }
    }
}

/// Element dimension of the generated mesh. Cut-cell meshing is limited to
/// 3D solids, but the value is carried so configs stay explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ElementDimension {
    #[serde(rename = "2D")]
    TwoD,
    #[serde(rename = "3D")]
    ThreeD,
}

impl Default for ElementDimension {
    fn default() -> Self {
        ElementDimension::ThreeD
    }
}

impl fmt::Display for ElementDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementDimension::TwoD => f.write_str("2D"),
            ElementDimension::ThreeD => f.write_str("3D"),
        }
    }
}

/// Host platform family, as far as process termination is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFamily {
    Windows,
    Unix,
}

impl PlatformFamily {
    /// Platform family of the running binary.
    pub fn current() -> Self {
        if cfg!(windows) {
            PlatformFamily::Windows
        } else {
            PlatformFamily::Unix
        }
    }
}
