//! Triangles and the primitive tests every acceleration structure is built on.

use refract_kernel_math::{Aabb3, Point3, Vec3};

use crate::error::{MeshError, Result};

/// Floats per triangle in a flat buffer (3 vertices x 3 components).
pub const FLOATS_PER_TRIANGLE: usize = 9;

const DET_EPSILON: f32 = 1e-12;

/// A world-space triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex.
    pub a: Point3,
    /// Second vertex.
    pub b: Point3,
    /// Third vertex.
    pub c: Point3,
}

impl Triangle {
    /// Create a triangle from three vertices.
    pub fn new(a: Point3, b: Point3, c: Point3) -> Self {
        Self { a, b, c }
    }

    /// Vertices in winding order.
    pub fn vertices(&self) -> [Point3; 3] {
        [self.a, self.b, self.c]
    }

    /// Unnormalized face normal `(b - a) x (c - a)`.
    pub fn geometric_normal(&self) -> Vec3 {
        (self.b - self.a).cross(&(self.c - self.a))
    }

    /// Unit face normal, `None` for zero-area triangles.
    pub fn normal(&self) -> Option<Vec3> {
        self.geometric_normal().try_normalize(DET_EPSILON)
    }

    /// True for zero-area triangles.
    pub fn is_degenerate(&self) -> bool {
        self.normal().is_none()
    }

    /// Vertex average.
    pub fn centroid(&self) -> Point3 {
        Point3::from((self.a.coords + self.b.coords + self.c.coords) / 3.0)
    }

    /// Tight bounding box.
    pub fn aabb(&self) -> Aabb3 {
        Aabb3::new(self.a.inf(&self.b).inf(&self.c), self.a.sup(&self.b).sup(&self.c))
    }

    /// Two-sided Möller–Trumbore intersection.
    ///
    /// Returns the ray parameter `t` (in units of `dir`), which may be
    /// negative; callers clip it against their own interval.
    #[inline]
    pub fn intersect_ray(&self, origin: &Point3, dir: &Vec3) -> Option<f32> {
        self.intersect(origin, dir, false)
    }

    /// Backface-culled intersection: rays travelling along the face normal
    /// (`dir . n > 0`) never hit.
    #[inline]
    pub fn intersect_ray_front(&self, origin: &Point3, dir: &Vec3) -> Option<f32> {
        self.intersect(origin, dir, true)
    }

    fn intersect(&self, origin: &Point3, dir: &Vec3, cull_back: bool) -> Option<f32> {
        let e1 = self.b - self.a;
        let e2 = self.c - self.a;
        if cull_back && dir.dot(&e1.cross(&e2)) > 0.0 {
            return None;
        }

        let p = dir.cross(&e2);
        let det = e1.dot(&p);
        if det.abs() < DET_EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;

        let s = origin - self.a;
        let u = s.dot(&p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&e1);
        let v = dir.dot(&q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        Some(e2.dot(&q) * inv_det)
    }

    /// Separating-axis overlap test against a box.
    ///
    /// Tests the 3 box face normals, the triangle normal and the 9 edge
    /// cross products. Touching counts as overlap.
    pub fn overlaps_aabb(&self, aabb: &Aabb3) -> bool {
        let center = aabb.center();
        let half = aabb.extents() * 0.5;
        let v = [self.a - center, self.b - center, self.c - center];

        for axis in 0..3 {
            let lo = v[0][axis].min(v[1][axis]).min(v[2][axis]);
            let hi = v[0][axis].max(v[1][axis]).max(v[2][axis]);
            if lo > half[axis] || hi < -half[axis] {
                return false;
            }
        }

        let edges = [v[1] - v[0], v[2] - v[1], v[0] - v[2]];
        if separated(&edges[0].cross(&edges[1]), &v, &half) {
            return false;
        }

        for edge in &edges {
            for axis in 0..3 {
                let mut unit = Vec3::zeros();
                unit[axis] = 1.0;
                if separated(&unit.cross(edge), &v, &half) {
                    return false;
                }
            }
        }

        true
    }
}

/// Projects the triangle and the box onto `axis`; true if the intervals are disjoint.
fn separated(axis: &Vec3, v: &[Vec3; 3], half: &Vec3) -> bool {
    let p0 = v[0].dot(axis);
    let p1 = v[1].dot(axis);
    let p2 = v[2].dot(axis);
    let r = half.x * axis.x.abs() + half.y * axis.y.abs() + half.z * axis.z.abs();
    p0.min(p1).min(p2) > r || p0.max(p1).max(p2) < -r
}

/// Parse a flat `[ax, ay, az, bx, ..., cz]*` buffer.
pub fn triangles_from_floats(data: &[f32]) -> Result<Vec<Triangle>> {
    if data.len() % FLOATS_PER_TRIANGLE != 0 {
        return Err(MeshError::MalformedTriangles(data.len()));
    }
    Ok(data
        .chunks_exact(FLOATS_PER_TRIANGLE)
        .map(|f| {
            Triangle::new(
                Point3::new(f[0], f[1], f[2]),
                Point3::new(f[3], f[4], f[5]),
                Point3::new(f[6], f[7], f[8]),
            )
        })
        .collect())
}

/// Flatten triangles into 9 floats each.
pub fn triangles_to_floats(triangles: &[Triangle]) -> Vec<f32> {
    let mut out = Vec::with_capacity(triangles.len() * FLOATS_PER_TRIANGLE);
    for tri in triangles {
        for p in tri.vertices() {
            out.extend_from_slice(&[p.x, p.y, p.z]);
        }
    }
    out
}

/// Bounding box of a triangle set, `None` when empty.
pub fn triangles_aabb(triangles: &[Triangle]) -> Option<Aabb3> {
    let mut iter = triangles.iter();
    let mut aabb = iter.next()?.aabb();
    for tri in iter {
        aabb.union(&tri.aabb());
    }
    Some(aabb)
}
