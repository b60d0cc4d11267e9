//! A built acceleration structure of any kind.

use std::fmt;
use std::str::FromStr;

use refract_kernel_math::Aabb3;
use refract_kernel_raytrace::grid::{self, GridTraceOptions};
use refract_kernel_raytrace::{LinearBvh, Ray, RayCast, RayHit};
use refract_kernel_voxel::{SvoBuffer, VoxelGridBuffer};
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};

/// Which structure to build or load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    /// Bounding volume hierarchy over the exact triangles.
    Bvh,
    /// Dense voxel grid.
    Grid,
    /// Sparse voxel octree.
    Svo,
}

impl StructureKind {
    /// All kinds, in build-cost order.
    pub const ALL: [StructureKind; 3] = [Self::Bvh, Self::Grid, Self::Svo];

    /// Short lowercase name, also used as the file extension.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bvh => "bvh",
            Self::Grid => "grid",
            Self::Svo => "svo",
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StructureKind {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| KernelError::UnknownKind(s.to_string()))
    }
}

/// A traversal-ready structure.
///
/// Every variant answers the same [`RayCast`] query, so callers can hold
/// whichever one an asset was built with.
#[derive(Debug, Clone, PartialEq)]
pub enum AccelStructure {
    /// Triangle BVH.
    Bvh(LinearBvh),
    /// Dense voxel grid and its traversal options.
    Grid(VoxelGridBuffer, GridTraceOptions),
    /// Sparse voxel octree.
    Svo(SvoBuffer),
}

impl AccelStructure {
    /// Variant kind.
    pub fn kind(&self) -> StructureKind {
        match self {
            Self::Bvh(_) => StructureKind::Bvh,
            Self::Grid(..) => StructureKind::Grid,
            Self::Svo(_) => StructureKind::Svo,
        }
    }

    /// World-space bounds of the structure.
    pub fn bounds(&self) -> Aabb3 {
        match self {
            Self::Bvh(bvh) => bvh.root_bounds().unwrap_or_else(Aabb3::empty),
            Self::Grid(grid, _) => grid.bounds(),
            Self::Svo(svo) => svo.bounds(),
        }
    }

    /// Serialize to the kind's binary buffer layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Bvh(bvh) => bvh.to_bytes(),
            Self::Grid(grid, _) => grid.to_bytes(),
            Self::Svo(svo) => svo.to_bytes(),
        }
    }

    /// Parse a buffer written by [`AccelStructure::to_bytes`].
    ///
    /// The layouts carry no tag, so the caller names the kind. Grids load
    /// with default traversal options.
    pub fn from_bytes(kind: StructureKind, bytes: &[u8]) -> Result<Self> {
        Ok(match kind {
            StructureKind::Bvh => Self::Bvh(LinearBvh::from_bytes(bytes)?),
            StructureKind::Grid => {
                Self::Grid(VoxelGridBuffer::from_bytes(bytes)?, GridTraceOptions::default())
            }
            StructureKind::Svo => Self::Svo(SvoBuffer::from_bytes(bytes)?),
        })
    }

    /// One-line human readable summary.
    pub fn summary(&self) -> String {
        let b = self.bounds();
        let bounds = format!(
            "[{:.3}, {:.3}, {:.3}] - [{:.3}, {:.3}, {:.3}]",
            b.min.x, b.min.y, b.min.z, b.max.x, b.max.y, b.max.z
        );
        match self {
            Self::Bvh(bvh) => format!(
                "bvh: {} nodes, {} triangles, depth {}, bounds {bounds}",
                bvh.node_count(),
                bvh.primitives().len(),
                bvh.depth()
            ),
            Self::Grid(grid, _) => {
                let [x, y, z] = grid.geometry.dims;
                format!(
                    "grid ({:?}): {x}x{y}x{z} voxels of {:.4}, {} filled, bounds {bounds}",
                    grid.method,
                    grid.geometry.voxel_size,
                    grid.filled_count()
                )
            }
            Self::Svo(svo) => format!(
                "svo ({:?}): depth {}, {} nodes, bounds {bounds}",
                svo.method,
                svo.depth,
                svo.node_count()
            ),
        }
    }
}

impl RayCast for AccelStructure {
    fn ray_cast(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<RayHit> {
        match self {
            Self::Bvh(bvh) => bvh.ray_cast(ray, t_min, t_max),
            Self::Grid(buffer, options) => grid::ray_cast(buffer, ray, t_min, t_max, options),
            Self::Svo(svo) => RayCast::ray_cast(svo, ray, t_min, t_max),
        }
    }
}

impl From<LinearBvh> for AccelStructure {
    fn from(bvh: LinearBvh) -> Self {
        Self::Bvh(bvh)
    }
}

impl From<VoxelGridBuffer> for AccelStructure {
    fn from(grid: VoxelGridBuffer) -> Self {
        Self::Grid(grid, GridTraceOptions::default())
    }
}

impl From<SvoBuffer> for AccelStructure {
    fn from(svo: SvoBuffer) -> Self {
        Self::Svo(svo)
    }
}
