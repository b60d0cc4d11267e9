//! Sparse voxel octree builder and breadth-first linearizer.

use std::collections::VecDeque;

use refract_kernel_math::{Aabb3, Point3, Vec3};
use refract_kernel_mesh::{triangles_aabb, Triangle};

use crate::error::{Result, VoxelError};
use crate::settings::{SimplifySettings, SvoSettings};
use crate::svo_buffer::{LinearSvoNode, SvoBuffer};
use crate::voxelize::{voxelize, ContouringMethod, GridGeometry};

/// Octree node stored in the [`Svo`] arena.
#[derive(Debug, Clone, PartialEq)]
pub struct SvoNode {
    /// Arena indices of the 8 octants.
    pub children: [Option<u32>; 8],
    /// Levels above the leaves; 0 for leaves.
    pub depth: u32,
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
    /// Normal or vertex, set on leaves.
    pub payload: Vec3,
    /// True for depth-0 nodes and nodes collapsed by simplification.
    pub is_leaf: bool,
}

impl SvoNode {
    fn new(min: Point3, max: Point3, depth: u32) -> Self {
        Self {
            children: [None; 8],
            depth,
            min,
            max,
            payload: Vec3::zeros(),
            is_leaf: depth == 0,
        }
    }

    /// Octant midpoint.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Octant of `p`: bit 0 set for `x >= mid.x`, bit 1 for y, bit 2 for z.
    pub fn child_slot(&self, p: &Point3) -> usize {
        let mid = self.center();
        (p.x >= mid.x) as usize | ((p.y >= mid.y) as usize) << 1 | ((p.z >= mid.z) as usize) << 2
    }

    fn make_child(&self, slot: usize) -> SvoNode {
        let mid = self.center();
        let mut min = self.min;
        let mut max = mid;
        for axis in 0..3 {
            if slot & (1 << axis) != 0 {
                min[axis] = mid[axis];
                max[axis] = self.max[axis];
            }
        }
        SvoNode::new(min, max, self.depth - 1)
    }
}

/// Sparse voxel octree over an axis-aligned cube.
///
/// Nodes live in an arena with the root at index 0; parents own their
/// children through indices only.
#[derive(Debug, Clone)]
pub struct Svo {
    depth: u32,
    method: ContouringMethod,
    nodes: Vec<SvoNode>,
}

impl Svo {
    /// An empty octree of the given depth.
    pub fn new(depth: u32, min: Point3, max: Point3) -> Self {
        Self {
            depth,
            method: ContouringMethod::default(),
            nodes: vec![SvoNode::new(min, max, depth)],
        }
    }

    /// Tag the payloads as produced by `method`.
    pub fn with_method(mut self, method: ContouringMethod) -> Self {
        self.method = method;
        self
    }

    /// How leaf payloads were produced.
    pub fn method(&self) -> ContouringMethod {
        self.method
    }

    /// Root depth.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Root bounds.
    pub fn bounds(&self) -> Aabb3 {
        Aabb3::new(self.nodes[0].min, self.nodes[0].max)
    }

    /// Root node.
    pub fn root(&self) -> &SvoNode {
        &self.nodes[0]
    }

    /// Node by arena index.
    pub fn node(&self, index: u32) -> Option<&SvoNode> {
        self.nodes.get(index as usize)
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf).count()
    }

    /// Store `payload` in the leaf containing `point`, creating the path.
    ///
    /// Returns the leaf's arena index. Reinserting a point overwrites.
    pub fn insert_voxel(&mut self, point: &Point3, payload: Vec3) -> u32 {
        let mut index = 0u32;
        loop {
            let node = &self.nodes[index as usize];
            if node.is_leaf {
                self.nodes[index as usize].payload = payload;
                return index;
            }
            let slot = node.child_slot(point);
            index = match node.children[slot] {
                Some(child) => child,
                None => {
                    let child = node.make_child(slot);
                    let child_index = self.nodes.len() as u32;
                    self.nodes.push(child);
                    self.nodes[index as usize].children[slot] = Some(child_index);
                    child_index
                }
            };
        }
    }

    /// Flatten in level order.
    ///
    /// A node's `child_offset` is the distance from the node to its first
    /// child, assigned when that child is emitted; the remaining children
    /// follow contiguously in octant order. Leaves keep offset 0.
    pub fn linearize(&self) -> Vec<LinearSvoNode> {
        let mut out: Vec<LinearSvoNode> = Vec::with_capacity(self.nodes.len());
        let mut queue = VecDeque::from([(0u32, None::<usize>)]);

        while let Some((node_index, parent)) = queue.pop_front() {
            let index = out.len();
            if let Some(parent) = parent {
                if out[parent].child_offset == 0 {
                    out[parent].child_offset = (index - parent) as u32;
                }
            }

            let node = &self.nodes[node_index as usize];
            let mut child_mask = 0u8;
            for (slot, child) in node.children.iter().enumerate() {
                if let Some(child) = child {
                    child_mask |= 1 << slot;
                    queue.push_back((*child, Some(index)));
                }
            }
            out.push(LinearSvoNode {
                child_mask,
                is_leaf: node.is_leaf,
                child_offset: 0,
                payload: node.payload,
            });
        }
        out
    }

    /// Linearize and pack into a traversal buffer.
    pub fn to_buffer(&self) -> Result<SvoBuffer> {
        let bounds = self.bounds();
        SvoBuffer::from_nodes(
            bounds.min,
            bounds.max,
            self.depth,
            self.method,
            &self.linearize(),
        )
    }

    /// Collapse nodes whose children are similar leaves.
    ///
    /// A candidate is either full or at least
    /// [`SimplifySettings::min_levels_below_root`] levels below the root.
    /// It collapses when every child is a leaf whose payload has a dot
    /// product of at least [`SimplifySettings::min_similarity`] with the
    /// first child's; the new leaf takes the mean payload. Returns the
    /// number of nodes removed.
    pub fn simplify(&mut self, settings: &SimplifySettings) -> usize {
        let removed = self.simplify_node(0, settings);
        if removed > 0 {
            self.compact();
        }
        removed
    }

    fn simplify_node(&mut self, index: usize, settings: &SimplifySettings) -> usize {
        if self.nodes[index].is_leaf {
            return 0;
        }

        let children = self.nodes[index].children;
        let mut removed = 0;
        for child in children.iter().flatten() {
            removed += self.simplify_node(*child as usize, settings);
        }

        let full = children.iter().all(Option::is_some);
        let deep = self.depth - self.nodes[index].depth >= settings.min_levels_below_root;
        if !full && !deep {
            return removed;
        }

        let kids: Vec<&SvoNode> = children
            .iter()
            .flatten()
            .map(|&c| &self.nodes[c as usize])
            .collect();
        let Some(first) = kids.first() else {
            return removed;
        };
        let similar = kids
            .iter()
            .all(|k| k.is_leaf && first.payload.dot(&k.payload) >= settings.min_similarity);
        if !similar {
            return removed;
        }

        let count = kids.len();
        let mean = kids.iter().fold(Vec3::zeros(), |acc, k| acc + k.payload) / count as f32;
        let node = &mut self.nodes[index];
        node.children = [None; 8];
        node.is_leaf = true;
        node.payload = mean;
        removed + count
    }

    /// Drop unreachable arena entries, preserving breadth-first order.
    fn compact(&mut self) {
        let mut remap: Vec<Option<u32>> = vec![None; self.nodes.len()];
        let mut order = vec![0usize];
        remap[0] = Some(0);
        let mut cursor = 0;
        while cursor < order.len() {
            for child in self.nodes[order[cursor]].children.iter().flatten() {
                remap[*child as usize] = Some(order.len() as u32);
                order.push(*child as usize);
            }
            cursor += 1;
        }

        let mut nodes: Vec<SvoNode> = order.iter().map(|&i| self.nodes[i].clone()).collect();
        for node in &mut nodes {
            for child in node.children.iter_mut() {
                *child = child.and_then(|c| remap[c as usize]);
            }
        }
        self.nodes = nodes;
    }
}

/// Voxelize into a `2^depth` cube grid and insert every filled voxel.
pub fn voxelize_mesh_svo(triangles: &[Triangle], settings: &SvoSettings) -> Result<Svo> {
    settings.validate()?;
    let bounds = triangles_aabb(triangles).ok_or(VoxelError::EmptyMesh)?;
    let geometry = GridGeometry::cube(&bounds, settings.depth);
    let grid = voxelize(triangles, geometry, settings.method, &settings.qef);

    let cube = geometry.bounds();
    let mut svo = Svo::new(settings.depth, cube.min, cube.max).with_method(settings.method);
    for (coords, voxel) in grid.filled() {
        svo.insert_voxel(&geometry.voxel_center(coords), grid.world_payload(coords, voxel));
    }

    if let Some(simplify) = &settings.simplify {
        let removed = svo.simplify(simplify);
        log::debug!("simplification removed {removed} nodes");
    }
    log::debug!(
        "built octree of depth {} with {} nodes, {} leaves",
        settings.depth,
        svo.node_count(),
        svo.leaf_count()
    );
    Ok(svo)
}
