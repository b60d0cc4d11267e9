//! Combined build settings, loadable from TOML.

use refract_kernel_raytrace::BvhSettings;
use refract_kernel_voxel::{GridSettings, SvoSettings};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Settings for every structure kind.
///
/// ```toml
/// [grid]
/// grid_size = 64
/// method = "dual_contouring"
///
/// [svo]
/// depth = 7
///
/// [bvh]
/// max_prims_per_leaf = 4
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Dense voxel grid.
    pub grid: GridSettings,
    /// Sparse voxel octree.
    pub svo: SvoSettings,
    /// Bounding volume hierarchy.
    pub bvh: BvhSettings,
}

impl BuildSettings {
    /// Parse and validate a TOML document. Missing tables and fields keep
    /// their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let settings: Self = toml::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        self.svo.validate()?;
        self.bvh.validate()?;
        Ok(())
    }
}
