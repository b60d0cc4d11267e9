//! Packed linear octree.
//!
//! Each node is one texel: `xyz` payload plus a header in `w`, stored as
//! raw bits:
//!
//! | bits  | field                              |
//! |-------|------------------------------------|
//! | 0-7   | child mask                         |
//! | 8     | leaf flag                          |
//! | 9-31  | offset from the node to its first child |
//!
//! The serialized form starts with an 8-float header
//! `(min.xyz, max.xyz, depth, node_count)`, integers as raw bits. The low 16
//! bits of the depth word hold the depth and the rest the contouring method,
//! so average-normal trees carry a plain depth.

use refract_kernel_math::bits::{
    f32s_from_le_bytes, f32s_to_le_bytes, float_as_int, float_as_uint, int_as_float,
    uint_as_float,
};
use refract_kernel_math::{Aabb3, Point3, Vec3};

use crate::error::{Result, VoxelError};
use crate::grid_buffer::Texel;
use crate::settings::MAX_SVO_DEPTH;
use crate::voxelize::ContouringMethod;

/// Floats in the octree buffer header.
pub const SVO_HEADER_FLOATS: usize = 8;

/// Largest child offset the header can hold.
pub const MAX_CHILD_OFFSET: u32 = (1 << 23) - 1;

/// Pack a node header.
pub fn pack_header(child_mask: u8, is_leaf: bool, child_offset: u32) -> Result<u32> {
    if child_offset > MAX_CHILD_OFFSET {
        return Err(VoxelError::OffsetOverflow(child_offset));
    }
    Ok(child_mask as u32 | (is_leaf as u32) << 8 | child_offset << 9)
}

/// Unpack a node header into `(child_mask, is_leaf, child_offset)`.
#[inline]
pub fn unpack_header(header: u32) -> (u8, bool, u32) {
    ((header & 0xFF) as u8, (header >> 8) & 1 != 0, header >> 9)
}

/// Index of the child in `slot` for a node at `index` with the given header.
///
/// Children are stored contiguously in slot order, so the position is the
/// number of populated slots below `slot`.
#[inline]
pub fn child_index(index: usize, child_mask: u8, child_offset: u32, slot: usize) -> Option<usize> {
    if child_mask & (1 << slot) == 0 || child_offset == 0 {
        return None;
    }
    let before = (child_mask & ((1u8 << slot) - 1)).count_ones() as usize;
    Some(index + child_offset as usize + before)
}

/// A node of the level-order octree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSvoNode {
    /// Populated octants.
    pub child_mask: u8,
    /// Leaf flag.
    pub is_leaf: bool,
    /// Distance to the first child; 0 when there is none.
    pub child_offset: u32,
    /// Normal or vertex.
    pub payload: Vec3,
}

impl LinearSvoNode {
    /// Index of the child in `slot`, given this node's own index.
    pub fn child_index(&self, index: usize, slot: usize) -> Option<usize> {
        child_index(index, self.child_mask, self.child_offset, slot)
    }

    /// Pack into a texel.
    pub fn to_texel(&self) -> Result<Texel> {
        let header = pack_header(self.child_mask, self.is_leaf, self.child_offset)?;
        Ok([self.payload.x, self.payload.y, self.payload.z, uint_as_float(header)])
    }

    /// Unpack a texel.
    pub fn from_texel(texel: &Texel) -> Self {
        let (child_mask, is_leaf, child_offset) = unpack_header(float_as_uint(texel[3]));
        Self {
            child_mask,
            is_leaf,
            child_offset,
            payload: Vec3::new(texel[0], texel[1], texel[2]),
        }
    }
}

/// Traversal-ready octree.
#[derive(Debug, Clone, PartialEq)]
pub struct SvoBuffer {
    /// Root cube minimum.
    pub min: Point3,
    /// Root cube maximum.
    pub max: Point3,
    /// Tree depth.
    pub depth: u32,
    /// How leaf payloads were produced.
    pub method: ContouringMethod,
    /// One texel per node, level order.
    pub texels: Vec<Texel>,
}

impl SvoBuffer {
    /// Pack linearized nodes.
    pub fn from_nodes(
        min: Point3,
        max: Point3,
        depth: u32,
        method: ContouringMethod,
        nodes: &[LinearSvoNode],
    ) -> Result<Self> {
        let texels = nodes
            .iter()
            .map(LinearSvoNode::to_texel)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            min,
            max,
            depth,
            method,
            texels,
        })
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.texels.len()
    }

    /// Root bounds.
    pub fn bounds(&self) -> Aabb3 {
        Aabb3::new(self.min, self.max)
    }

    /// Raw header of node `index`.
    #[inline]
    pub fn header(&self, index: usize) -> Option<u32> {
        self.texels.get(index).map(|t| float_as_uint(t[3]))
    }

    /// Decoded node `index`.
    pub fn fetch(&self, index: usize) -> Option<LinearSvoNode> {
        self.texels.get(index).map(LinearSvoNode::from_texel)
    }

    /// 2-D texture shape `(width, height)` for at most `max_width` texels per row.
    pub fn tex_size(&self, max_width: u32) -> (u32, u32) {
        let n = self.texels.len() as u32;
        let width = max_width.min(n).max(1);
        (width, n.div_ceil(width))
    }

    /// Texture coordinate of node `index` in a texture `width` texels wide.
    pub fn texel_coords(index: usize, width: u32) -> (u32, u32) {
        let width = width.max(1) as usize;
        ((index % width) as u32, (index / width) as u32)
    }

    /// Header followed by texels.
    pub fn to_floats(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(SVO_HEADER_FLOATS + self.texels.len() * 4);
        out.extend_from_slice(&[self.min.x, self.min.y, self.min.z]);
        out.extend_from_slice(&[self.max.x, self.max.y, self.max.z]);
        out.push(uint_as_float(self.depth | self.method.as_raw() << 16));
        out.push(int_as_float(self.texels.len() as i32));
        out.extend_from_slice(bytemuck::cast_slice::<Texel, f32>(&self.texels));
        out
    }

    /// Parse [`SvoBuffer::to_floats`] output.
    pub fn from_floats(data: &[f32]) -> Result<Self> {
        if data.len() < SVO_HEADER_FLOATS {
            return Err(VoxelError::Truncated {
                expected: SVO_HEADER_FLOATS,
                actual: data.len(),
            });
        }
        let depth_word = float_as_uint(data[6]);
        let depth = depth_word & 0xFFFF;
        if depth > MAX_SVO_DEPTH {
            return Err(VoxelError::header(format!("depth {depth}")));
        }
        let method = ContouringMethod::from_raw(depth_word >> 16)
            .ok_or_else(|| VoxelError::header(format!("contouring method {}", depth_word >> 16)))?;
        let node_count = float_as_int(data[7]);
        if node_count < 1 {
            return Err(VoxelError::header(format!("node count {node_count}")));
        }
        let expected = SVO_HEADER_FLOATS + node_count as usize * 4;
        if data.len() != expected {
            return Err(if data.len() < expected {
                VoxelError::Truncated {
                    expected,
                    actual: data.len(),
                }
            } else {
                VoxelError::header(format!("{} trailing floats", data.len() - expected))
            });
        }

        Ok(Self {
            min: Point3::new(data[0], data[1], data[2]),
            max: Point3::new(data[3], data[4], data[5]),
            depth,
            method,
            texels: bytemuck::cast_slice::<f32, Texel>(&data[SVO_HEADER_FLOATS..]).to_vec(),
        })
    }

    /// Little-endian bytes of [`SvoBuffer::to_floats`].
    pub fn to_bytes(&self) -> Vec<u8> {
        f32s_to_le_bytes(&self.to_floats())
    }

    /// Parse [`SvoBuffer::to_bytes`] output.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let floats = f32s_from_le_bytes(bytes)
            .ok_or_else(|| VoxelError::header("byte length is not a multiple of 4"))?;
        Self::from_floats(&floats)
    }
}
