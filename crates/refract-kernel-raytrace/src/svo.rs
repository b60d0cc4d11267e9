//! Stackless ray march through a packed sparse voxel octree.
//!
//! The octree is mapped onto the cube `[1, 2]^3` and the ray is mirrored so
//! that every direction component is negative. Cube positions then live in
//! the float mantissa: bit `22 - k` of `pos` selects the octant at level
//! `k + 1`. Leaving a cube is detected from the direction of the step, and
//! the common ancestor of the old and new cubes is the highest mantissa bit
//! in which the two positions differ. Instead of a parent stack, the
//! ancestor is found again by walking from the root along those bits.

use refract_kernel_math::{Point3, Vec3};
use refract_kernel_voxel::svo_buffer::{child_index, unpack_header};
use refract_kernel_voxel::{ContouringMethod, SvoBuffer};

use crate::ray::{Ray, RayCast, RayHit};

/// Bits of float mantissa available for octree levels.
const MAX_SCALE: i32 = 23;

/// Direction components smaller than this are replaced to keep the
/// reciprocals finite.
const DIR_EPSILON: f32 = 0.001;

/// Distance, in unit-cube lengths, kept from the far face when marching
/// back from the exit.
const EXIT_BACKOFF: f32 = 0.01;

/// Where the march stopped.
#[derive(Debug, Clone, Copy)]
struct Marched {
    /// Parameter along the unit-cube ray.
    t: f32,
    /// Axis of the face through which the leaf was entered.
    entry_axis: Option<usize>,
    /// Leaf node index.
    node: usize,
}

/// A ray expressed in the `[1, 2]^3` frame of an octree, with a unit
/// direction.
struct CubeRay {
    origin: Point3,
    /// Octree units per world unit of ray parameter.
    scale: f32,
    /// World parameter of `origin`.
    t_start: f32,
}

impl CubeRay {
    fn new(svo: &SvoBuffer, ray: &Ray, t_start: f32) -> Option<Self> {
        let bounds = svo.bounds();
        let size = bounds.max.x - bounds.min.x;
        let len = ray.direction.norm();
        if size <= 0.0 || len == 0.0 {
            return None;
        }
        let world = ray.at(t_start);
        Some(Self {
            origin: Point3::from(Vec3::repeat(1.5) + (world - bounds.center()) / size),
            scale: len / size,
            t_start,
        })
    }

    fn world_t(&self, cube_t: f32) -> f32 {
        self.t_start + cube_t / self.scale
    }
}

fn max_iterations(depth: u32) -> usize {
    (16usize << depth.min(16)).max(100)
}

/// Normal at a leaf hit: the outward mean normal for average-normal trees,
/// otherwise the face the ray entered through.
fn hit_normal(svo: &SvoBuffer, marched: &Marched, face: Vec3) -> Vec3 {
    match svo.method {
        ContouringMethod::AverageNormals => svo
            .fetch(marched.node)
            .and_then(|n| (-n.payload).try_normalize(1e-6))
            .unwrap_or(face),
        ContouringMethod::DualContouring => face,
    }
}

/// March a unit-direction ray through the `[1, 2]^3` cube.
///
/// Stops at the first leaf entered before `t_limit`. With
/// `skip_origin_leaf`, a leaf that already contains the ray origin is
/// stepped over.
fn march(
    svo: &SvoBuffer,
    origin: &Point3,
    dir: &Vec3,
    t_limit: f32,
    skip_origin_leaf: bool,
) -> Option<Marched> {
    let d = dir.map(|c| if c.abs() < DIR_EPSILON { DIR_EPSILON.copysign(c) } else { c });

    // t(x) = x * coef - bias along each axis, mirrored so the ray runs toward
    // smaller coordinates.
    let coef = d.map(|c| 1.0 / -c.abs());
    let mut bias = coef.component_mul(&origin.coords);
    let mut octant_mask = 0usize;
    for axis in 0..3 {
        if d[axis] > 0.0 {
            octant_mask ^= 1 << axis;
            bias[axis] = 3.0 * coef[axis] - bias[axis];
        }
    }
    let t_at = |p: &Vec3| p.component_mul(&coef) - bias;

    let entry = t_at(&Vec3::repeat(2.0));
    let mut t_min = entry.max().max(0.0);
    let t_max_root = t_at(&Vec3::repeat(1.0)).min().min(t_limit);
    let mut t_max = t_max_root;
    if t_min > t_max {
        return None;
    }
    let mut entry_axis = (entry.max() > 0.0).then(|| entry.imax());

    let (mut mask, root_leaf, mut offset) = unpack_header(svo.header(0)?);
    if root_leaf {
        return (!(skip_origin_leaf && t_min <= 0.0)).then_some(Marched {
            t: t_min,
            entry_axis,
            node: 0,
        });
    }

    let mut node = 0usize;
    let mut idx = 0usize;
    let mut pos = Vec3::repeat(1.0);
    let mut scale = MAX_SCALE - 1;
    let mut scale_exp2 = 0.5f32;
    let first = t_at(&Vec3::repeat(1.5));
    for axis in 0..3 {
        if first[axis] > t_min {
            idx ^= 1 << axis;
            pos[axis] = 1.5;
        }
    }

    for _ in 0..max_iterations(svo.depth) {
        let corner = t_at(&pos);
        let tc_max = corner.min();

        let slot = idx ^ octant_mask;
        if (mask >> slot) & 1 != 0 && t_min <= t_max {
            let tv_max = t_max.min(tc_max);
            let half = scale_exp2 * 0.5;
            if t_min <= tv_max {
                let child = child_index(node, mask, offset, slot)?;
                let (child_mask, child_leaf, child_offset) = unpack_header(svo.header(child)?);
                if child_leaf {
                    if !(skip_origin_leaf && t_min <= 0.0) {
                        return Some(Marched {
                            t: t_min,
                            entry_axis,
                            node: child,
                        });
                    }
                } else {
                    // PUSH: enter the child and pick the octant the ray starts in.
                    let center = corner + coef * half;
                    node = child;
                    mask = child_mask;
                    offset = child_offset;
                    idx = 0;
                    scale -= 1;
                    scale_exp2 = half;
                    for axis in 0..3 {
                        if center[axis] >= t_min {
                            idx ^= 1 << axis;
                            pos[axis] += scale_exp2;
                        }
                    }
                    t_max = tv_max;
                    continue;
                }
            }
        }

        // ADVANCE
        let mut step_mask = 0usize;
        for axis in 0..3 {
            if corner[axis] <= tc_max {
                step_mask ^= 1 << axis;
                pos[axis] -= scale_exp2;
            }
        }
        entry_axis = (0..3).find(|axis| step_mask & (1 << axis) != 0);
        t_min = tc_max;
        idx ^= step_mask;
        if t_min > t_max_root {
            return None;
        }

        if idx & step_mask != 0 {
            // POP: the highest differing mantissa bit gives the ancestor level.
            let mut differing = 0u32;
            for axis in 0..3 {
                if step_mask & (1 << axis) != 0 {
                    differing |= pos[axis].to_bits() ^ (pos[axis] + scale_exp2).to_bits();
                }
            }
            scale = ((differing as f32).to_bits() >> 23) as i32 - 127;
            if !(0..MAX_SCALE).contains(&scale) {
                return None;
            }
            scale_exp2 = f32::from_bits(((scale - MAX_SCALE + 127) as u32) << 23);

            (node, mask, offset) = descend(svo, &pos, scale, octant_mask)?;

            let shifted = pos.map(|p| p.to_bits() >> scale);
            pos = shifted.map(|s| f32::from_bits(s << scale));
            idx = (shifted.x & 1 | (shifted.y & 1) << 1 | (shifted.z & 1) << 2) as usize;
            t_max = t_max_root;
        }
    }
    None
}

/// Walk from the root to the parent of the cube at `pos` of size `2^(scale - 23)`.
fn descend(svo: &SvoBuffer, pos: &Vec3, scale: i32, octant_mask: usize) -> Option<(usize, u8, u32)> {
    let mut node = 0usize;
    let (mut mask, _, mut offset) = unpack_header(svo.header(0)?);
    for bit in (scale + 1..MAX_SCALE).rev() {
        let b = |axis: usize| ((pos[axis].to_bits() >> bit) & 1) as usize;
        let slot = (b(0) | b(1) << 1 | b(2) << 2) ^ octant_mask;
        node = child_index(node, mask, offset, slot)?;
        (mask, _, offset) = unpack_header(svo.header(node)?);
    }
    Some((node, mask, offset))
}

/// Nearest leaf hit along the ray, marching forward from where the ray
/// enters the root cube.
///
/// A leaf containing the ray origin is not reported. Hits are placed on
/// the leaf boundary where the ray enters it.
pub fn ray_cast(svo: &SvoBuffer, ray: &Ray, t_min: f32, t_max: f32) -> Option<RayHit> {
    let (t0, t1) = ray.intersect_aabb(&svo.bounds(), t_min, t_max)?;
    let dir = ray.direction.try_normalize(0.0)?;
    let cube = CubeRay::new(svo, ray, t0)?;
    let origin_inside = t0 <= t_min;

    let marched = march(svo, &cube.origin, &dir, (t1 - t0) * cube.scale, origin_inside)?;
    let t = cube.world_t(marched.t);
    if t > t_max {
        return None;
    }
    let face = ray.face_normal(marched.entry_axis);
    Some(RayHit::new(t, ray.at(t), hit_normal(svo, &marched, face)))
}

/// Last leaf the ray passes through before leaving the root cube.
///
/// Starts just inside the far exit and marches backwards toward the ray
/// origin. Useful for finding where a ray travelling inside a closed object
/// leaves it. The normal faces along the ray.
pub fn ray_cast_from_exit(svo: &SvoBuffer, ray: &Ray, t_min: f32, t_max: f32) -> Option<RayHit> {
    let (t0, t1) = ray.intersect_aabb(&svo.bounds(), t_min, t_max)?;
    let dir = ray.direction.try_normalize(0.0)?;
    let probe = CubeRay::new(svo, ray, t0)?;
    let span = (t1 - t0) * probe.scale;
    let start = span - EXIT_BACKOFF.min(span * 0.5);

    let back = -dir;
    let origin = probe.origin + dir * start;
    let marched = march(svo, &origin, &back, start, false)?;
    let t = probe.world_t(start - marched.t);
    if t < t_min {
        return None;
    }
    let face = Ray::new(ray.origin, -ray.direction).face_normal(marched.entry_axis);
    Some(RayHit::new(t, ray.at(t), hit_normal(svo, &marched, face)))
}

impl RayCast for SvoBuffer {
    fn ray_cast(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<RayHit> {
        ray_cast(self, ray, t_min, t_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::unit_cube;
    use approx::assert_abs_diff_eq;
    use refract_kernel_voxel::{voxelize_mesh_svo, Svo, SvoSettings};

    fn cube_svo(depth: u32, method: ContouringMethod) -> SvoBuffer {
        let settings = SvoSettings {
            depth,
            method,
            ..Default::default()
        };
        voxelize_mesh_svo(&unit_cube(), &settings)
            .unwrap()
            .to_buffer()
            .unwrap()
    }

    /// A 2-level tree over `[0, 4]^3` with the given leaves.
    fn tree(leaves: &[(f32, f32, f32)]) -> SvoBuffer {
        let mut svo = Svo::new(2, Point3::origin(), Point3::new(4.0, 4.0, 4.0));
        for &(x, y, z) in leaves {
            svo.insert_voxel(&Point3::new(x, y, z), Vec3::new(0.0, 0.0, 1.0));
        }
        svo.to_buffer().unwrap()
    }

    #[test]
    fn test_svo_hits_single_leaf() {
        let svo = tree(&[(2.5, 1.5, 0.5)]);
        let ray = Ray::new(Point3::new(2.5, 1.5, 10.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = ray_cast(&svo, &ray, 0.0, f32::INFINITY).unwrap();
        // Leaf spans z in [0, 1]; entered through its top face.
        assert_abs_diff_eq!(hit.t, 9.0, epsilon = 1e-3);
        assert_abs_diff_eq!(hit.point.z, 1.0, epsilon = 1e-3);
        // Payload (0, 0, 1) is stored negated.
        assert_abs_diff_eq!(hit.normal.z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_svo_nearest_of_several() {
        let svo = tree(&[(0.5, 0.5, 0.5), (3.5, 0.5, 0.5), (1.5, 0.5, 0.5)]);
        let ray = Ray::new(Point3::new(-3.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        let hit = ray_cast(&svo, &ray, 0.0, f32::INFINITY).unwrap();
        assert_abs_diff_eq!(hit.t, 3.0, epsilon = 1e-3);

        let back = Ray::new(Point3::new(7.0, 0.5, 0.5), Vec3::new(-1.0, 0.0, 0.0));
        let hit = ray_cast(&svo, &back, 0.0, f32::INFINITY).unwrap();
        assert_abs_diff_eq!(hit.t, 3.0, epsilon = 1e-3);
    }

    #[test]
    fn test_svo_skips_empty_octants() {
        // The ray crosses two empty root octants before reaching the leaf.
        let svo = tree(&[(3.5, 3.5, 3.5)]);
        let ray = Ray::new(Point3::new(-1.0, 3.5, 3.5), Vec3::new(1.0, 0.0, 0.0));
        let hit = ray_cast(&svo, &ray, 0.0, f32::INFINITY).unwrap();
        assert_abs_diff_eq!(hit.t, 4.0, epsilon = 1e-3);
        assert_abs_diff_eq!(hit.point.x, 3.0, epsilon = 1e-3);
    }

    #[test]
    fn test_svo_miss() {
        let svo = tree(&[(0.5, 0.5, 0.5)]);
        let parallel = Ray::new(Point3::new(-1.0, 3.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert!(ray_cast(&svo, &parallel, 0.0, f32::INFINITY).is_none());
        let outside = Ray::new(Point3::new(-1.0, 9.0, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert!(ray_cast(&svo, &outside, 0.0, f32::INFINITY).is_none());
    }

    #[test]
    fn test_svo_respects_t_max() {
        let svo = tree(&[(3.5, 0.5, 0.5)]);
        let ray = Ray::new(Point3::new(-1.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert!(ray_cast(&svo, &ray, 0.0, 3.0).is_none());
        assert!(ray_cast(&svo, &ray, 0.0, 4.5).is_some());
    }

    #[test]
    fn test_svo_origin_leaf_is_skipped() {
        let svo = tree(&[(0.5, 0.5, 0.5), (2.5, 0.5, 0.5)]);
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        let hit = ray_cast(&svo, &ray, 0.0, f32::INFINITY).unwrap();
        assert_abs_diff_eq!(hit.t, 1.5, epsilon = 1e-3);
    }

    #[test]
    fn test_svo_cube_shell() {
        let svo = cube_svo(4, ContouringMethod::AverageNormals);
        let ray = Ray::new(Point3::new(0.37, 0.61, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = ray_cast(&svo, &ray, 0.0, f32::INFINITY).unwrap();
        // Within one voxel of the top face.
        let voxel = (svo.max.x - svo.min.x) / 16.0;
        assert!((hit.point.z - 1.0).abs() <= voxel);
        assert!(hit.normal.z > 0.5);
    }

    #[test]
    fn test_svo_dual_contouring_face_normal() {
        let svo = cube_svo(3, ContouringMethod::DualContouring);
        let ray = Ray::new(Point3::new(-4.0, 0.41, 0.53), Vec3::new(1.0, 0.0, 0.0));
        let hit = ray_cast(&svo, &ray, 0.0, f32::INFINITY).unwrap();
        assert_eq!(hit.normal, Vec3::new(-1.0, 0.0, 0.0));
        let voxel = (svo.max.x - svo.min.x) / 8.0;
        assert!(hit.point.x.abs() <= voxel);
    }

    #[test]
    fn test_svo_from_exit_finds_far_surface() {
        let svo = cube_svo(4, ContouringMethod::AverageNormals);
        let ray = Ray::new(Point3::new(0.37, 0.61, 0.45), Vec3::new(0.0, 0.0, 1.0));
        let hit = ray_cast_from_exit(&svo, &ray, 0.0, f32::INFINITY).unwrap();
        let voxel = (svo.max.x - svo.min.x) / 16.0;
        assert!((hit.point.z - 1.0).abs() <= voxel);
        assert!(hit.normal.z > 0.5);

        let forward = ray_cast(&svo, &ray, 0.0, f32::INFINITY).unwrap();
        assert_abs_diff_eq!(forward.point.z, hit.point.z, epsilon = voxel);
    }

    #[test]
    fn test_svo_collapsed_root() {
        let mut svo = Svo::new(1, Point3::origin(), Point3::new(2.0, 2.0, 2.0));
        for x in [0.5, 1.5] {
            for y in [0.5, 1.5] {
                for z in [0.5, 1.5] {
                    svo.insert_voxel(&Point3::new(x, y, z), Vec3::new(0.0, -1.0, 0.0));
                }
            }
        }
        svo.simplify(&Default::default());
        let buffer = svo.to_buffer().unwrap();
        assert_eq!(buffer.node_count(), 1);

        let ray = Ray::new(Point3::new(1.0, 5.0, 1.0), Vec3::new(0.0, -2.0, 0.0));
        let hit = ray_cast(&buffer, &ray, 0.0, f32::INFINITY).unwrap();
        assert_abs_diff_eq!(hit.t, 1.5, epsilon = 1e-3);
        assert_abs_diff_eq!(hit.normal.y, 1.0, epsilon = 1e-6);

        let inside = Ray::new(Point3::new(1.0, 1.0, 1.0), Vec3::new(0.0, -1.0, 0.0));
        assert!(ray_cast(&buffer, &inside, 0.0, f32::INFINITY).is_none());
    }
}
