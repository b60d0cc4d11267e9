//! Axis-aligned bounding boxes.

use crate::{max_dimension, Point3, Vec3};

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb3 {
    /// Create an AABB from min and max corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Smallest box containing every point, or `None` for an empty iterator.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Option<Self> {
        let mut aabb = Self::empty();
        let mut any = false;
        for p in points {
            aabb.include_point(p);
            any = true;
        }
        any.then_some(aabb)
    }

    /// True until a point has been included.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Expand this AABB to include another box.
    pub fn union(&mut self, other: &Aabb3) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    /// Test if two AABBs overlap (touching counts as overlap).
    pub fn overlaps(&self, other: &Aabb3) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Inclusive point containment.
    pub fn contains(&self, p: &Point3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Expand the AABB by `amount` in all directions.
    pub fn expand(&mut self, amount: f32) {
        let d = Vec3::repeat(amount);
        self.min -= d;
        self.max += d;
    }

    /// Box center.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Edge lengths along each axis.
    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }

    /// Longest edge length.
    pub fn max_extent(&self) -> f32 {
        self.extents().max()
    }

    /// Axis (0, 1, 2) of the longest edge.
    pub fn max_dimension(&self) -> usize {
        max_dimension(&self.extents())
    }

    /// Surface area; zero for flat boxes.
    pub fn surface_area(&self) -> f32 {
        let d = self.extents();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Position of `p` relative to the box, 0 at `min` and 1 at `max` per axis.
    ///
    /// Flat axes map to 0.
    pub fn offset(&self, p: &Point3) -> Vec3 {
        let o = p - self.min;
        let d = self.extents();
        Vec3::new(
            if d.x > 0.0 { o.x / d.x } else { 0.0 },
            if d.y > 0.0 { o.y / d.y } else { 0.0 },
            if d.z > 0.0 { o.z / d.z } else { 0.0 },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> Aabb3 {
        Aabb3::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_empty_then_include() {
        let mut aabb = Aabb3::empty();
        assert!(aabb.is_empty());
        aabb.include_point(&Point3::new(1.0, -2.0, 3.0));
        aabb.include_point(&Point3::new(-1.0, 2.0, 0.0));
        assert!(!aabb.is_empty());
        assert_eq!(aabb.min, Point3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_from_points_empty() {
        assert!(Aabb3::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_overlap_touching() {
        let a = unit();
        let b = Aabb3::new(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        let c = Aabb3::new(Point3::new(1.5, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_surface_area_and_extent() {
        let mut a = unit();
        assert_eq!(a.surface_area(), 6.0);
        a.expand(0.5);
        assert_eq!(a.max_extent(), 2.0);
        assert_eq!(a.center(), Point3::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn test_offset_flat_axis() {
        let flat = Aabb3::new(Point3::origin(), Point3::new(2.0, 0.0, 4.0));
        let o = flat.offset(&Point3::new(1.0, 0.0, 1.0));
        assert_eq!(o, Vec3::new(0.5, 0.0, 0.25));
        assert_eq!(flat.surface_area(), 16.0);
    }
}
