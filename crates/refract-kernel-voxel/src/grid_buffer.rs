//! Flat texel buffer for dense voxel grids.
//!
//! Layout: an 8-float header `(method, min.x, min.y, min.z, dim.x, dim.y,
//! dim.z, voxel_size)` with integer fields stored as raw bits, then one
//! `[x, y, z, w]` texel per voxel in x-fastest order. `xyz` is the normal
//! or world-space vertex; `w` carries `filled | edges << 1` as raw bits.

use refract_kernel_math::bits::{
    f32s_from_le_bytes, f32s_to_le_bytes, float_as_int, float_as_uint, int_as_float,
    uint_as_float,
};
use refract_kernel_math::{Aabb3, IVec3, Point3};

use crate::error::{Result, VoxelError};
use crate::voxelize::{ContouringMethod, GridGeometry, VoxelGrid, EDGE_MASK_BITS};

/// One RGBA float texel.
pub type Texel = [f32; 4];

/// Floats in the grid buffer header.
pub const GRID_HEADER_FLOATS: usize = 8;

const FLAG_EDGE_BITS: u32 = 0x7F_FFFF;

/// Pack the `w` channel.
pub fn encode_flags(filled: bool, edges: u32) -> f32 {
    uint_as_float(filled as u32 | (edges & EDGE_MASK_BITS) << 1)
}

/// Unpack the `w` channel into `(filled, edges)`.
pub fn decode_flags(w: f32) -> (bool, u32) {
    let bits = float_as_uint(w);
    (bits & 1 != 0, (bits >> 1) & FLAG_EDGE_BITS)
}

/// Traversal-ready dense grid.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGridBuffer {
    /// Payload kind.
    pub method: ContouringMethod,
    /// World placement.
    pub geometry: GridGeometry,
    /// One texel per voxel.
    pub texels: Vec<Texel>,
}

impl VoxelGridBuffer {
    /// Pack a voxelized grid.
    pub fn from_grid(grid: &VoxelGrid) -> Self {
        let texels = grid
            .voxels
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let p = grid.world_payload(grid.geometry.coords_of(i), v);
                [p.x, p.y, p.z, encode_flags(v.is_filled(), v.edges())]
            })
            .collect();
        Self {
            method: grid.method,
            geometry: grid.geometry,
            texels,
        }
    }

    /// Texel of `cell`, `None` outside the grid.
    #[inline]
    pub fn texel(&self, cell: &IVec3) -> Option<&Texel> {
        let dims = self.geometry.dims;
        if (0..3).any(|a| cell[a] < 0 || cell[a] as u32 >= dims[a]) {
            return None;
        }
        let coords = [cell.x as u32, cell.y as u32, cell.z as u32];
        self.texels.get(self.geometry.index(coords))
    }

    /// World-space bounds.
    pub fn bounds(&self) -> Aabb3 {
        self.geometry.bounds()
    }

    /// Number of filled voxels.
    pub fn filled_count(&self) -> usize {
        self.texels.iter().filter(|t| decode_flags(t[3]).0).count()
    }

    /// Header followed by texels.
    pub fn to_floats(&self) -> Vec<f32> {
        let g = &self.geometry;
        let mut out = Vec::with_capacity(GRID_HEADER_FLOATS + self.texels.len() * 4);
        out.push(uint_as_float(self.method.as_raw()));
        out.extend_from_slice(&[g.min.x, g.min.y, g.min.z]);
        out.extend(g.dims.map(|d| int_as_float(d as i32)));
        out.push(g.voxel_size);
        out.extend_from_slice(bytemuck::cast_slice::<Texel, f32>(&self.texels));
        out
    }

    /// Parse [`VoxelGridBuffer::to_floats`] output.
    pub fn from_floats(data: &[f32]) -> Result<Self> {
        if data.len() < GRID_HEADER_FLOATS {
            return Err(VoxelError::Truncated {
                expected: GRID_HEADER_FLOATS,
                actual: data.len(),
            });
        }
        let method = ContouringMethod::from_raw(float_as_uint(data[0]))
            .ok_or_else(|| VoxelError::header(format!("unknown method {}", float_as_uint(data[0]))))?;
        let mut dims = [0u32; 3];
        for (axis, d) in dims.iter_mut().enumerate() {
            let raw = float_as_int(data[4 + axis]);
            if raw < 1 {
                return Err(VoxelError::header(format!("dimension {raw} on axis {axis}")));
            }
            *d = raw as u32;
        }
        let voxel_size = data[7];
        if voxel_size <= 0.0 || !voxel_size.is_finite() {
            return Err(VoxelError::header(format!("voxel size {voxel_size}")));
        }

        let geometry = GridGeometry::new(Point3::new(data[1], data[2], data[3]), dims, voxel_size);
        let expected = geometry
            .checked_voxel_count()
            .and_then(|n| n.checked_mul(4))
            .and_then(|n| n.checked_add(GRID_HEADER_FLOATS))
            .ok_or_else(|| VoxelError::header(format!("dimensions {dims:?} overflow")))?;
        if data.len() < expected {
            return Err(VoxelError::Truncated {
                expected,
                actual: data.len(),
            });
        }
        if data.len() > expected {
            return Err(VoxelError::header(format!(
                "{} trailing floats",
                data.len() - expected
            )));
        }

        Ok(Self {
            method,
            geometry,
            texels: bytemuck::cast_slice::<f32, Texel>(&data[GRID_HEADER_FLOATS..]).to_vec(),
        })
    }

    /// Little-endian bytes of [`VoxelGridBuffer::to_floats`].
    pub fn to_bytes(&self) -> Vec<u8> {
        f32s_to_le_bytes(&self.to_floats())
    }

    /// Parse [`VoxelGridBuffer::to_bytes`] output.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let floats = f32s_from_le_bytes(bytes)
            .ok_or_else(|| VoxelError::header("byte length is not a multiple of 4"))?;
        Self::from_floats(&floats)
    }
}

impl From<&VoxelGrid> for VoxelGridBuffer {
    fn from(grid: &VoxelGrid) -> Self {
        Self::from_grid(grid)
    }
}
