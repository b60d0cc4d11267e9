//! Surface area heuristic BVH construction.

use refract_kernel_math::{Aabb3, Point3};
use refract_kernel_mesh::Triangle;
use serde::{Deserialize, Serialize};

use crate::bvh::{BvhBuilder, BvhNode, LinearBvh, TRAVERSAL_STACK_SIZE};
use crate::error::{BvhError, Result};

/// BVH build settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhSettings {
    /// Spans with fewer primitives than this always become leaves.
    pub max_prims_per_leaf: u32,
    /// Centroid buckets evaluated per split.
    pub buckets: u32,
}

impl Default for BvhSettings {
    fn default() -> Self {
        Self {
            max_prims_per_leaf: 2,
            buckets: 12,
        }
    }
}

impl BvhSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.max_prims_per_leaf == 0 {
            return Err(BvhError::InvalidSettings(
                "max_prims_per_leaf must be at least 1".into(),
            ));
        }
        if self.buckets < 2 {
            return Err(BvhError::InvalidSettings("buckets must be at least 2".into()));
        }
        Ok(())
    }
}

/// Bucketed SAH builder.
#[derive(Debug, Clone, Default)]
pub struct SahBuilder {
    settings: BvhSettings,
}

/// A triangle waiting to be placed in a leaf.
#[derive(Debug, Clone, Copy)]
struct BuildPrimitive {
    index: usize,
    aabb: Aabb3,
    centroid: Point3,
}

/// Pointer-based node, flattened once the tree is complete.
enum BuildNode {
    Leaf {
        aabb: Aabb3,
        offset: usize,
        count: usize,
    },
    Interior {
        aabb: Aabb3,
        axis: usize,
        children: [Box<BuildNode>; 2],
    },
}

impl BuildNode {
    fn aabb(&self) -> Aabb3 {
        match self {
            BuildNode::Leaf { aabb, .. } | BuildNode::Interior { aabb, .. } => *aabb,
        }
    }
}

#[derive(Clone, Copy, Default)]
struct Bucket {
    count: usize,
    bounds: Option<Aabb3>,
}

impl SahBuilder {
    /// Builder with custom settings.
    pub fn new(settings: BvhSettings) -> Self {
        Self { settings }
    }

    /// Active settings.
    pub fn settings(&self) -> &BvhSettings {
        &self.settings
    }

    fn build_node(&self, prims: &mut [BuildPrimitive], ordered: &mut Vec<usize>) -> BuildNode {
        let aabb = prims.iter().fold(Aabb3::empty(), |mut acc, p| {
            acc.union(&p.aabb);
            acc
        });
        let count = prims.len();

        let leaf = |prims: &[BuildPrimitive], ordered: &mut Vec<usize>| {
            let offset = ordered.len();
            ordered.extend(prims.iter().map(|p| p.index));
            BuildNode::Leaf {
                aabb,
                offset,
                count: prims.len(),
            }
        };

        if aabb.surface_area() == 0.0 || count < self.settings.max_prims_per_leaf as usize {
            return leaf(prims, ordered);
        }

        let centroid_bounds = prims.iter().fold(Aabb3::empty(), |mut acc, p| {
            acc.include_point(&p.centroid);
            acc
        });
        let axis = centroid_bounds.max_dimension();
        if centroid_bounds.min[axis] == centroid_bounds.max[axis] {
            return leaf(prims, ordered);
        }

        let Some(split) = self.find_best_split(prims, &centroid_bounds, axis, &aabb) else {
            return leaf(prims, ordered);
        };

        let mid = partition_primitives(prims, |p| {
            self.bucket_of(&centroid_bounds, &p.centroid, axis) <= split
        });
        if mid == 0 || mid == count {
            return leaf(prims, ordered);
        }

        let (left, right) = prims.split_at_mut(mid);
        let first = self.build_node(left, ordered);
        let second = self.build_node(right, ordered);
        BuildNode::Interior {
            aabb,
            axis,
            children: [Box::new(first), Box::new(second)],
        }
    }

    fn bucket_of(&self, centroid_bounds: &Aabb3, centroid: &Point3, axis: usize) -> usize {
        let n = self.settings.buckets as usize;
        let b = (n as f32 * centroid_bounds.offset(centroid)[axis]) as usize;
        b.min(n - 1)
    }

    /// Bucket index after which to split, or `None` when a leaf is cheaper.
    ///
    /// A split costs `0.5 + (n_below * area_below + n_above * area_above) / area`
    /// against a leaf cost of the primitive count.
    fn find_best_split(
        &self,
        prims: &[BuildPrimitive],
        centroid_bounds: &Aabb3,
        axis: usize,
        bounds: &Aabb3,
    ) -> Option<usize> {
        let n = self.settings.buckets as usize;
        let mut buckets = vec![Bucket::default(); n];
        for p in prims {
            let b = &mut buckets[self.bucket_of(centroid_bounds, &p.centroid, axis)];
            b.count += 1;
            b.bounds = Some(match b.bounds {
                Some(mut acc) => {
                    acc.union(&p.aabb);
                    acc
                }
                None => p.aabb,
            });
        }

        let area = |b: &Option<Aabb3>| b.map_or(0.0, |b| b.surface_area());
        let mut costs = vec![0.0f32; n - 1];

        let mut count_below = 0;
        let mut bounds_below: Option<Aabb3> = None;
        for (i, cost) in costs.iter_mut().enumerate() {
            merge(&mut bounds_below, &buckets[i].bounds);
            count_below += buckets[i].count;
            *cost = count_below as f32 * area(&bounds_below);
        }

        let mut count_above = 0;
        let mut bounds_above: Option<Aabb3> = None;
        for i in (1..n).rev() {
            merge(&mut bounds_above, &buckets[i].bounds);
            count_above += buckets[i].count;
            costs[i - 1] += count_above as f32 * area(&bounds_above);
        }

        let (best, min_cost) = costs
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, c)| *c != 0.0)
            .min_by(|a, b| a.1.total_cmp(&b.1))?;

        let split_cost = 0.5 + min_cost / bounds.surface_area();
        (split_cost < prims.len() as f32).then_some(best)
    }
}

impl BvhBuilder for SahBuilder {
    fn build(&self, triangles: &[Triangle]) -> Result<LinearBvh> {
        self.settings.validate()?;
        if triangles.is_empty() {
            return Err(BvhError::EmptyMesh);
        }

        let mut prims: Vec<BuildPrimitive> = triangles
            .iter()
            .enumerate()
            .map(|(index, tri)| BuildPrimitive {
                index,
                aabb: tri.aabb(),
                centroid: tri.centroid(),
            })
            .collect();
        let mut ordered = Vec::with_capacity(triangles.len());
        let root = self.build_node(&mut prims, &mut ordered);

        let mut nodes = Vec::new();
        let mut bounds = Vec::new();
        flatten_node(&root, &mut nodes, &mut bounds);
        let primitives = ordered.iter().map(|&i| triangles[i]).collect();
        let bvh = LinearBvh::from_parts(nodes, bounds, primitives)?;

        let depth = bvh.depth();
        if depth > TRAVERSAL_STACK_SIZE {
            log::warn!(
                "BVH depth {depth} exceeds the traversal stack of {TRAVERSAL_STACK_SIZE}; \
                 some rays may miss"
            );
        }
        log::debug!(
            "built BVH over {} triangles: {} nodes, depth {depth}",
            triangles.len(),
            bvh.node_count()
        );
        Ok(bvh)
    }
}

fn merge(acc: &mut Option<Aabb3>, other: &Option<Aabb3>) {
    if let Some(other) = other {
        match acc {
            Some(acc) => acc.union(other),
            None => *acc = Some(*other),
        }
    }
}

/// Move primitives matching `below` to the front; returns the split point.
fn partition_primitives(
    prims: &mut [BuildPrimitive],
    below: impl Fn(&BuildPrimitive) -> bool,
) -> usize {
    let mut left = 0;
    let mut right = prims.len();

    while left < right {
        if below(&prims[left]) {
            left += 1;
        } else {
            right -= 1;
            prims.swap(left, right);
        }
    }

    left
}

/// Recursively flatten a build node depth-first.
fn flatten_node(node: &BuildNode, nodes: &mut Vec<BvhNode>, bounds: &mut Vec<Aabb3>) -> usize {
    let index = nodes.len();
    nodes.push(BvhNode::default());
    bounds.push(node.aabb());

    match node {
        BuildNode::Leaf { offset, count, .. } => {
            nodes[index] = BvhNode::leaf(*offset, *count);
        }
        BuildNode::Interior { axis, children, .. } => {
            flatten_node(&children[0], nodes, bounds);
            let second = flatten_node(&children[1], nodes, bounds);
            nodes[index] = BvhNode::interior(second, *axis);
        }
    }

    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{unit_cube, wavy_sheet};

    fn leaves(bvh: &LinearBvh) -> impl Iterator<Item = (usize, &BvhNode)> {
        bvh.nodes().iter().enumerate().filter(|(_, n)| n.is_leaf())
    }

    #[test]
    fn test_sah_every_triangle_in_one_leaf() {
        let triangles = wavy_sheet(10);
        let bvh = SahBuilder::default().build(&triangles).unwrap();
        let total: usize = leaves(&bvh).map(|(_, n)| n.prim_count()).sum();
        assert_eq!(total, triangles.len());
        assert_eq!(bvh.primitives().len(), triangles.len());
        for tri in &triangles {
            assert!(bvh.primitives().contains(tri));
        }
    }

    #[test]
    fn test_sah_bounds_nest() {
        let bvh = SahBuilder::default().build(&unit_cube()).unwrap();
        for (i, node) in bvh.nodes().iter().enumerate() {
            let b = bvh.bounds()[i];
            if node.is_leaf() {
                let first = node.prim_or_second_child as usize;
                for tri in &bvh.primitives()[first..first + node.prim_count()] {
                    for p in tri.vertices() {
                        assert!(b.contains(&p));
                    }
                }
            } else {
                for child in [i + 1, node.prim_or_second_child as usize] {
                    let c = bvh.bounds()[child];
                    assert!(b.contains(&c.min) && b.contains(&c.max));
                }
            }
        }
    }

    #[test]
    fn test_sah_leaf_contains_centroid() {
        let bvh = SahBuilder::default().build(&wavy_sheet(6)).unwrap();
        for (i, node) in leaves(&bvh) {
            let first = node.prim_or_second_child as usize;
            for tri in &bvh.primitives()[first..first + node.prim_count()] {
                assert!(bvh.bounds()[i].contains(&tri.centroid()));
                assert!(bvh.bounds()[i].overlaps(&tri.aabb()));
            }
        }
    }

    #[test]
    fn test_sah_leaf_size_setting() {
        let triangles = wavy_sheet(4);
        let single = SahBuilder::new(BvhSettings {
            max_prims_per_leaf: 64,
            ..Default::default()
        })
        .build(&triangles)
        .unwrap();
        assert_eq!(single.node_count(), 1);
        assert_eq!(single.nodes()[0].prim_count(), triangles.len());
    }

    #[test]
    fn test_sah_flat_bounds_make_a_leaf() {
        // Collinear triangles have zero-area bounds.
        let line = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        );
        let bvh = SahBuilder::default().build(&[line; 5]).unwrap();
        assert_eq!(bvh.node_count(), 1);
    }

    #[test]
    fn test_sah_rejects_empty_and_bad_settings() {
        assert!(matches!(
            SahBuilder::default().build(&[]),
            Err(BvhError::EmptyMesh)
        ));
        let bad = SahBuilder::new(BvhSettings {
            max_prims_per_leaf: 0,
            ..Default::default()
        });
        assert!(matches!(
            bad.build(&unit_cube()),
            Err(BvhError::InvalidSettings(_))
        ));
    }
}
