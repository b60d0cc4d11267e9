//! Build settings for voxel structures.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxelError};
use crate::qef::QefSolveSettings;
use crate::voxelize::ContouringMethod;

/// Largest supported octree depth.
pub const MAX_SVO_DEPTH: u32 = 16;

/// Dense voxel grid parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Voxel count along the longest mesh axis.
    pub grid_size: u32,
    /// Per-voxel payload.
    pub method: ContouringMethod,
    /// Dual contouring solve options.
    pub qef: QefSolveSettings,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            grid_size: 32,
            method: ContouringMethod::AverageNormals,
            qef: QefSolveSettings::default(),
        }
    }
}

impl GridSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.grid_size < 1 {
            return Err(VoxelError::settings("grid_size must be at least 1"));
        }
        self.qef.validate()
    }
}

/// Leaf-merging options for octree simplification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifySettings {
    /// Nodes at least this many levels below the root may collapse even
    /// when some octants are empty.
    pub min_levels_below_root: u32,
    /// Minimum dot product between the first child's normal and each sibling's.
    pub min_similarity: f32,
}

impl Default for SimplifySettings {
    fn default() -> Self {
        Self {
            min_levels_below_root: 5,
            min_similarity: 0.9,
        }
    }
}

/// Sparse voxel octree parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvoSettings {
    /// Tree depth; the dense grid used for rasterization is `2^depth` per axis.
    pub depth: u32,
    /// Per-leaf payload.
    pub method: ContouringMethod,
    /// Dual contouring solve options.
    pub qef: QefSolveSettings,
    /// Merge similar leaves after insertion (average normals only).
    pub simplify: Option<SimplifySettings>,
}

impl Default for SvoSettings {
    fn default() -> Self {
        Self {
            depth: 6,
            method: ContouringMethod::AverageNormals,
            qef: QefSolveSettings::default(),
            simplify: None,
        }
    }
}

impl SvoSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_SVO_DEPTH).contains(&self.depth) {
            return Err(VoxelError::settings(format!(
                "depth must be between 1 and {MAX_SVO_DEPTH}"
            )));
        }
        if self.simplify.is_some() && self.method == ContouringMethod::DualContouring {
            return Err(VoxelError::settings(
                "simplify only applies to average-normal octrees",
            ));
        }
        self.qef.validate()
    }
}
