//! Linear bounding volume hierarchy: buffer format and traversal.
//!
//! Nodes are stored depth-first. An interior node's first child directly
//! follows it and its second child index is stored in the node; a leaf
//! stores the offset of its first primitive. The second word packs the
//! primitive count (upper 30 bits) with the split axis (lower 2 bits).
//!
//! The binary form is a sequence of little-endian 32-bit words:
//! `node_count, prim_count`, then `node_count` node pairs, then
//! `node_count` bounds `(min.xyz, max.xyz)`, then `prim_count` triangles
//! as 9 floats each.

use bytemuck::{Pod, Zeroable};
use refract_kernel_math::{Aabb3, Point3};
use refract_kernel_mesh::Triangle;

use crate::error::{BvhError, Result};
use crate::ray::{Ray, RayCast, RayHit};

/// Depth of the fixed traversal stack.
pub const TRAVERSAL_STACK_SIZE: usize = 32;

const HEADER_WORDS: usize = 2;
const BOUNDS_WORDS: usize = 6;
const TRIANGLE_WORDS: usize = 9;

/// One flattened node.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct BvhNode {
    /// First primitive for leaves, second child for interior nodes.
    pub prim_or_second_child: i32,
    /// `prim_count << 2 | split_axis`.
    pub packed: i32,
}

impl BvhNode {
    /// A leaf over `count` primitives starting at `offset`.
    pub fn leaf(offset: usize, count: usize) -> Self {
        Self {
            prim_or_second_child: offset as i32,
            packed: (count as i32) << 2,
        }
    }

    /// An interior node split along `axis`.
    pub fn interior(second_child: usize, axis: usize) -> Self {
        Self {
            prim_or_second_child: second_child as i32,
            packed: (axis & 0x3) as i32,
        }
    }

    /// Number of primitives; zero for interior nodes.
    #[inline]
    pub fn prim_count(&self) -> usize {
        (self.packed as u32 >> 2) as usize
    }

    /// Split axis.
    #[inline]
    pub fn split_axis(&self) -> usize {
        (self.packed & 0x3) as usize
    }

    /// True for nodes that hold primitives.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.prim_count() > 0
    }
}

/// Builds a [`LinearBvh`] from a triangle soup.
pub trait BvhBuilder {
    /// Build and flatten a hierarchy over `triangles`.
    fn build(&self, triangles: &[Triangle]) -> Result<LinearBvh>;
}

/// A flattened BVH with its node bounds and reordered triangles.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearBvh {
    nodes: Vec<BvhNode>,
    bounds: Vec<Aabb3>,
    primitives: Vec<Triangle>,
}

impl LinearBvh {
    /// Assemble and validate a hierarchy.
    pub fn from_parts(
        nodes: Vec<BvhNode>,
        bounds: Vec<Aabb3>,
        primitives: Vec<Triangle>,
    ) -> Result<Self> {
        let bvh = Self {
            nodes,
            bounds,
            primitives,
        };
        bvh.validate()?;
        Ok(bvh)
    }

    /// Nodes in depth-first order.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Per-node bounds.
    pub fn bounds(&self) -> &[Aabb3] {
        &self.bounds
    }

    /// Triangles in leaf order.
    pub fn primitives(&self) -> &[Triangle] {
        &self.primitives
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Bounds of the whole hierarchy.
    pub fn root_bounds(&self) -> Option<Aabb3> {
        self.bounds.first().copied()
    }

    /// Check that every child and primitive reference is in range.
    ///
    /// Second children must come after their parent's first child, which
    /// also rules out cycles.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(BvhError::InvalidHeader("hierarchy has no nodes".into()));
        }
        if self.bounds.len() != self.nodes.len() {
            return Err(BvhError::InvalidHeader(format!(
                "{} bounds for {} nodes",
                self.bounds.len(),
                self.nodes.len()
            )));
        }

        let n = self.nodes.len();
        for (index, node) in self.nodes.iter().enumerate() {
            let target = node.prim_or_second_child;
            if node.is_leaf() {
                let end = target as i64 + node.prim_count() as i64;
                if target < 0 || end > self.primitives.len() as i64 {
                    return Err(BvhError::node(
                        index,
                        format!("primitives {target}..{end} out of {}", self.primitives.len()),
                    ));
                }
            } else if index + 1 >= n || target as i64 <= index as i64 + 1 || target as usize >= n {
                return Err(BvhError::node(index, format!("second child {target} out of range")));
            }
        }
        Ok(())
    }

    /// Length of the longest root-to-leaf path, counting both ends.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(0usize, 1usize)];
        while let Some((index, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            let Some(node) = self.nodes.get(index) else {
                continue;
            };
            if !node.is_leaf() {
                pending.push((index + 1, depth + 1));
                pending.push((node.prim_or_second_child as usize, depth + 1));
            }
        }
        deepest
    }

    /// Serialize to the binary layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let words = HEADER_WORDS
            + self.nodes.len() * (2 + BOUNDS_WORDS)
            + self.primitives.len() * TRIANGLE_WORDS;
        let mut out = Vec::with_capacity(words * 4);
        out.extend_from_slice(&(self.nodes.len() as i32).to_le_bytes());
        out.extend_from_slice(&(self.primitives.len() as i32).to_le_bytes());
        for word in bytemuck::cast_slice::<BvhNode, i32>(&self.nodes) {
            out.extend_from_slice(&word.to_le_bytes());
        }
        for b in &self.bounds {
            for v in [b.min.x, b.min.y, b.min.z, b.max.x, b.max.y, b.max.z] {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        for tri in &self.primitives {
            for p in tri.vertices() {
                for v in [p.x, p.y, p.z] {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            }
        }
        out
    }

    /// Parse [`LinearBvh::to_bytes`] output.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_WORDS * 4 {
            return Err(BvhError::Truncated {
                expected: HEADER_WORDS * 4,
                actual: bytes.len(),
            });
        }
        if bytes.len() % 4 != 0 {
            return Err(BvhError::InvalidHeader(
                "byte length is not a multiple of 4".into(),
            ));
        }
        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        let node_count = words[0] as i32;
        let prim_count = words[1] as i32;
        if node_count < 1 || prim_count < 0 {
            return Err(BvhError::InvalidHeader(format!(
                "{node_count} nodes, {prim_count} primitives"
            )));
        }
        let (node_count, prim_count) = (node_count as usize, prim_count as usize);
        let expected = HEADER_WORDS + node_count * (2 + BOUNDS_WORDS) + prim_count * TRIANGLE_WORDS;
        if words.len() < expected {
            return Err(BvhError::Truncated {
                expected: expected * 4,
                actual: bytes.len(),
            });
        }
        if words.len() > expected {
            return Err(BvhError::InvalidHeader(format!(
                "{} trailing bytes",
                (words.len() - expected) * 4
            )));
        }

        let (node_words, rest) = words[HEADER_WORDS..].split_at(node_count * 2);
        let (bound_words, prim_words) = rest.split_at(node_count * BOUNDS_WORDS);
        let float = |w: &u32| f32::from_bits(*w);

        let nodes = node_words
            .chunks_exact(2)
            .map(|w| BvhNode {
                prim_or_second_child: w[0] as i32,
                packed: w[1] as i32,
            })
            .collect();
        let bounds = bound_words
            .chunks_exact(BOUNDS_WORDS)
            .map(|w| {
                let v: Vec<f32> = w.iter().map(float).collect();
                Aabb3::new(Point3::new(v[0], v[1], v[2]), Point3::new(v[3], v[4], v[5]))
            })
            .collect();
        let primitives = prim_words
            .chunks_exact(TRIANGLE_WORDS)
            .map(|w| {
                let v: Vec<f32> = w.iter().map(float).collect();
                Triangle::new(
                    Point3::new(v[0], v[1], v[2]),
                    Point3::new(v[3], v[4], v[5]),
                    Point3::new(v[6], v[7], v[8]),
                )
            })
            .collect();

        Self::from_parts(nodes, bounds, primitives)
    }

    /// Nearest two-sided triangle hit in `[t_min, t_max]`.
    ///
    /// Depth-first with a fixed stack; at interior nodes the child on the
    /// near side of the split axis is visited first and the far child is
    /// pushed. Node tests are clipped to the closest hit found so far. If
    /// the stack would overflow, the best hit so far is returned.
    pub fn ray_cast(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<RayHit> {
        if self.nodes.is_empty() {
            return None;
        }
        let sign = ray.sign();
        let mut stack = [0usize; TRAVERSAL_STACK_SIZE];
        let mut stack_len = 0;
        let mut current = 0usize;
        let mut closest: Option<(f32, usize)> = None;
        let mut t_far = t_max;

        loop {
            let node = self.nodes[current];
            if ray.intersect_aabb(&self.bounds[current], t_min, t_far).is_some() {
                if node.is_leaf() {
                    let first = node.prim_or_second_child as usize;
                    for i in first..first + node.prim_count() {
                        let Some(t) = self.primitives[i].intersect_ray(&ray.origin, &ray.direction)
                        else {
                            continue;
                        };
                        if t >= t_min && t <= t_far {
                            t_far = t;
                            closest = Some((t, i));
                        }
                    }
                } else {
                    let second = node.prim_or_second_child as usize;
                    let (near, far) = if sign[node.split_axis()] == 1 {
                        (second, current + 1)
                    } else {
                        (current + 1, second)
                    };
                    if stack_len == TRAVERSAL_STACK_SIZE {
                        break;
                    }
                    stack[stack_len] = far;
                    stack_len += 1;
                    current = near;
                    continue;
                }
            }
            if stack_len == 0 {
                break;
            }
            stack_len -= 1;
            current = stack[stack_len];
        }

        let (t, index) = closest?;
        let tri = &self.primitives[index];
        let normal = tri.normal().unwrap_or_else(|| ray.face_normal(None));
        Some(RayHit::new(t, ray.at(t), normal))
    }
}

impl RayCast for LinearBvh {
    fn ray_cast(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<RayHit> {
        LinearBvh::ray_cast(self, ray, t_min, t_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{unit_cube, wavy_sheet};
    use crate::sah::SahBuilder;
    use approx::assert_relative_eq;
    use refract_kernel_math::Vec3;

    fn cube_bvh() -> LinearBvh {
        SahBuilder::default().build(&unit_cube()).unwrap()
    }

    #[test]
    fn test_bvh_single_triangle() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        let bvh = SahBuilder::default().build(&[tri]).unwrap();
        assert_eq!(bvh.node_count(), 1);

        let ray = Ray::new(Point3::new(0.2, 0.2, 1.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = bvh.ray_cast(&ray, 0.0, f32::INFINITY).unwrap();
        assert_relative_eq!(hit.t, 1.0, epsilon = 1e-6);
        assert_relative_eq!(hit.normal.z, 1.0, epsilon = 1e-6);
        assert_relative_eq!(hit.point.x, 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_bvh_trace_cube() {
        let bvh = cube_bvh();
        let ray = Ray::new(Point3::new(0.3, 0.6, -5.0), Vec3::new(0.0, 0.0, 1.0));
        let hit = bvh.ray_cast(&ray, 0.0, f32::INFINITY).unwrap();
        assert_relative_eq!(hit.t, 5.0, epsilon = 1e-5);
        assert_relative_eq!(hit.normal.z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_bvh_trace_miss() {
        let bvh = cube_bvh();
        let ray = Ray::new(Point3::new(50.0, 50.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(bvh.ray_cast(&ray, 0.0, f32::INFINITY).is_none());
    }

    #[test]
    fn test_bvh_trace_from_inside() {
        let bvh = cube_bvh();
        let ray = Ray::new(Point3::new(0.5, 0.3, 0.6), Vec3::new(1.0, 0.0, 0.0));
        let hit = bvh.ray_cast(&ray, 0.0, f32::INFINITY).unwrap();
        assert_relative_eq!(hit.t, 0.5, epsilon = 1e-6);
        assert_relative_eq!(hit.normal.x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_bvh_respects_t_range() {
        let bvh = cube_bvh();
        let ray = Ray::new(Point3::new(0.3, 0.6, -5.0), Vec3::new(0.0, 0.0, 1.0));
        let far = bvh.ray_cast(&ray, 5.5, f32::INFINITY).unwrap();
        assert_relative_eq!(far.t, 6.0, epsilon = 1e-5);
        assert!(bvh.ray_cast(&ray, 0.0, 4.0).is_none());
    }

    #[test]
    fn test_bvh_diagonal_ray() {
        let bvh = cube_bvh();
        let ray = Ray::new(Point3::new(-1.0, -0.9, -0.8), Vec3::new(1.0, 1.0, 1.0));
        let hit = bvh.ray_cast(&ray, 0.0, f32::INFINITY).unwrap();
        assert_relative_eq!(hit.t, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_bvh_matches_brute_force() {
        let triangles = wavy_sheet(12);
        let bvh = SahBuilder::default().build(&triangles).unwrap();
        assert!(bvh.node_count() > 1);

        for i in 0..40 {
            let x = 0.05 + 0.023 * i as f32;
            let y = 0.9 - 0.021 * i as f32;
            let ray = Ray::new(Point3::new(x, y, 3.0), Vec3::new(0.1, -0.05, -1.0));
            let expected = triangles
                .iter()
                .filter_map(|t| t.intersect_ray(&ray.origin, &ray.direction))
                .filter(|t| *t >= 0.0)
                .min_by(f32::total_cmp);
            let actual = bvh.ray_cast(&ray, 0.0, f32::INFINITY).map(|h| h.t);
            match (expected, actual) {
                (Some(e), Some(a)) => assert_relative_eq!(e, a, epsilon = 1e-6),
                (None, None) => {}
                other => panic!("ray {i}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_bvh_bytes_round_trip() {
        let bvh = cube_bvh();
        let bytes = bvh.to_bytes();
        assert_eq!(
            bytes.len(),
            4 * (2 + bvh.node_count() * 8 + bvh.primitives().len() * 9)
        );
        let loaded = LinearBvh::from_bytes(&bytes).unwrap();
        assert_eq!(loaded, bvh);
        assert_eq!(loaded.to_bytes(), bytes);
    }

    #[test]
    fn test_bvh_rejects_bad_buffers() {
        let bytes = cube_bvh().to_bytes();
        assert!(matches!(
            LinearBvh::from_bytes(&bytes[..bytes.len() - 4]),
            Err(BvhError::Truncated { .. })
        ));
        assert!(matches!(
            LinearBvh::from_bytes(&bytes[..6]),
            Err(BvhError::Truncated { .. })
        ));

        let mut bad = bytes.clone();
        bad[8..12].copy_from_slice(&(-7i32).to_le_bytes());
        bad[12..16].copy_from_slice(&0i32.to_le_bytes());
        assert!(matches!(
            LinearBvh::from_bytes(&bad),
            Err(BvhError::InvalidNode { index: 0, .. })
        ));
    }

    #[test]
    fn test_bvh_node_packing() {
        let leaf = BvhNode::leaf(7, 3);
        assert!(leaf.is_leaf());
        assert_eq!(leaf.prim_count(), 3);
        assert_eq!(leaf.split_axis(), 0);
        let interior = BvhNode::interior(12, 2);
        assert!(!interior.is_leaf());
        assert_eq!(interior.split_axis(), 2);
        assert_eq!(interior.packed, 2);
    }

    #[test]
    fn test_bvh_depth() {
        let bvh = SahBuilder::default().build(&wavy_sheet(8)).unwrap();
        let depth = bvh.depth();
        assert!(depth > 1 && depth <= TRAVERSAL_STACK_SIZE);
    }
}
