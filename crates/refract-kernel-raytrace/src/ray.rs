//! Ray representation, hit records and the shared ray-cast contract.

use refract_kernel_math::{Aabb3, Point3, Vec3};

/// A ray in 3D space defined by origin and direction.
///
/// The direction is not normalized; ray parameters are measured in units
/// of its length.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Direction of the ray.
    pub direction: Vec3,
    /// Precomputed reciprocal of direction components for fast AABB tests.
    inv_direction: Vec3,
    /// Sign of direction components (0 if positive, 1 if negative).
    sign: [usize; 3],
}

impl Ray {
    /// Create a new ray from origin and direction.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        let inv = direction.map(|c| 1.0 / c);
        let sign = [
            if inv.x < 0.0 { 1 } else { 0 },
            if inv.y < 0.0 { 1 } else { 0 },
            if inv.z < 0.0 { 1 } else { 0 },
        ];
        Self {
            origin,
            direction,
            inv_direction: inv,
            sign,
        }
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f32) -> Point3 {
        self.origin + self.direction * t
    }

    /// Per-axis direction signs, 1 where the component is negative.
    #[inline]
    pub fn sign(&self) -> [usize; 3] {
        self.sign
    }

    /// Test ray-AABB intersection using the slab method, clipped to
    /// `[t_min, t_max]`.
    ///
    /// Returns the entry and exit parameters of the clipped span, or `None`
    /// when it is empty. Axis-parallel rays are handled through the
    /// infinite reciprocals.
    #[inline]
    pub fn intersect_aabb(&self, aabb: &Aabb3, t_min: f32, t_max: f32) -> Option<(f32, f32)> {
        let bounds = [aabb.min, aabb.max];
        let mut t0 = t_min;
        let mut t1 = t_max;
        for axis in 0..3 {
            let near = (bounds[self.sign[axis]][axis] - self.origin[axis]) * self.inv_direction[axis];
            let far =
                (bounds[1 - self.sign[axis]][axis] - self.origin[axis]) * self.inv_direction[axis];
            t0 = t0.max(near);
            t1 = t1.min(far);
        }
        (t0 <= t1).then_some((t0, t1))
    }

    /// Axis whose slab the ray enters `aabb` through last, i.e. the face the
    /// ray crosses on entry. `None` if the ray starts inside on every axis.
    pub fn entry_axis(&self, aabb: &Aabb3) -> Option<usize> {
        let bounds = [aabb.min, aabb.max];
        let mut best: Option<(usize, f32)> = None;
        for axis in 0..3 {
            if self.direction[axis] == 0.0 {
                continue;
            }
            let near = (bounds[self.sign[axis]][axis] - self.origin[axis]) * self.inv_direction[axis];
            if near >= 0.0 && best.map_or(true, |(_, t)| near > t) {
                best = Some((axis, near));
            }
        }
        best.map(|(axis, _)| axis)
    }

    /// Normal of an axis-aligned face entered along `axis`, facing the ray.
    pub fn face_normal(&self, axis: Option<usize>) -> Vec3 {
        match axis {
            Some(axis) => {
                let mut n = Vec3::zeros();
                n[axis] = -self.direction[axis].signum();
                n
            }
            None => -self.direction.try_normalize(0.0).unwrap_or_else(Vec3::z),
        }
    }
}

/// Result of a ray-structure intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Parameter along the ray where intersection occurs.
    pub t: f32,
    /// 3D intersection point.
    pub point: Point3,
    /// Unit surface normal at the intersection.
    pub normal: Vec3,
}

impl RayHit {
    /// Create a new ray hit.
    pub fn new(t: f32, point: Point3, normal: Vec3) -> Self {
        Self { t, point, normal }
    }
}

/// Nearest-hit ray casting, implemented by every traversal-ready structure.
///
/// Implementations are read-only over their buffers and may be called from
/// any number of threads at once. A miss, including one caused by an
/// iteration cap, is `None`.
///
/// Only the BVH and dual-contoured grids place `t` on a surface.
/// Average-normal grids report where the ray enters the first filled
/// voxel, and octrees report where it enters the hit leaf, so their `t` is
/// accurate to about one voxel diagonal.
pub trait RayCast: Send + Sync {
    /// Nearest hit with `t` in `[t_min, t_max]`.
    fn ray_cast(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<RayHit>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> Aabb3 {
        Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0));
        let p = ray.at(2.5);
        assert_relative_eq!(p.x, 5.0);
        assert_eq!(p.y, 0.0);
        assert_eq!(p.z, 0.0);
    }

    #[test]
    fn test_ray_aabb_hit() {
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        let (t_min, t_max) = ray.intersect_aabb(&unit_box(), 0.0, f32::INFINITY).unwrap();
        assert_relative_eq!(t_min, 5.0);
        assert_relative_eq!(t_max, 6.0);
    }

    #[test]
    fn test_ray_aabb_miss() {
        let ray = Ray::new(Point3::new(-5.0, 5.0, 5.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(ray.intersect_aabb(&unit_box(), 0.0, f32::INFINITY).is_none());
    }

    #[test]
    fn test_ray_inside_aabb() {
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        let (t_min, t_max) = ray.intersect_aabb(&unit_box(), 0.0, f32::INFINITY).unwrap();
        assert_eq!(t_min, 0.0);
        assert_relative_eq!(t_max, 0.5);
    }

    #[test]
    fn test_ray_aabb_behind() {
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(-1.0, 0.0, 0.0));
        assert!(ray.intersect_aabb(&unit_box(), 0.0, f32::INFINITY).is_none());
    }

    #[test]
    fn test_ray_aabb_clipped_range() {
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert!(ray.intersect_aabb(&unit_box(), 0.0, 4.0).is_none());
        let (t0, t1) = ray.intersect_aabb(&unit_box(), 5.5, 100.0).unwrap();
        assert_relative_eq!(t0, 5.5);
        assert_relative_eq!(t1, 6.0);
    }

    #[test]
    fn test_entry_face() {
        let ray = Ray::new(Point3::new(0.5, 0.5, 3.0), Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(ray.entry_axis(&unit_box()), Some(2));
        assert_eq!(ray.face_normal(Some(2)), Vec3::new(0.0, 0.0, 1.0));

        let inside = Ray::new(Point3::new(0.5, 0.5, 0.5), Vec3::new(0.0, 0.0, -2.0));
        assert_eq!(inside.entry_axis(&unit_box()), None);
        assert_eq!(inside.face_normal(None), Vec3::new(0.0, 0.0, 1.0));
    }
}
