//! Meshes shared by the integration tests.

#![allow(dead_code)]

use refract_kernel::refract_kernel_math::{Point3, Vec3};
use refract_kernel::refract_kernel_mesh::Triangle;

/// Unit cube, 8 vertices and 12 outward-facing triangles.
pub fn unit_cube() -> Vec<Triangle> {
    let v = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(1.0, 0.0, 1.0),
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(0.0, 1.0, 1.0),
    ];
    let faces = [
        [0, 3, 2],
        [0, 2, 1],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [3, 7, 6],
        [3, 6, 2],
        [0, 4, 7],
        [0, 7, 3],
        [1, 2, 6],
        [1, 6, 5],
    ];
    faces
        .iter()
        .map(|f| Triangle::new(v[f[0]], v[f[1]], v[f[2]]))
        .collect()
}

/// The triangle `(0,0,0), (1,0,0), (0,1,0)`.
pub fn corner_triangle() -> Triangle {
    Triangle::new(
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    )
}

/// UV sphere of radius 1 around the origin with outward winding.
pub fn uv_sphere(segments: usize, rings: usize) -> Vec<Triangle> {
    let p = |ring: usize, seg: usize| {
        let theta = std::f32::consts::PI * ring as f32 / rings as f32;
        let phi = std::f32::consts::TAU * seg as f32 / segments as f32;
        Point3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos())
    };
    let mut out = Vec::with_capacity(segments * rings * 2);
    for ring in 0..rings {
        for seg in 0..segments {
            let (a, b) = (p(ring, seg), p(ring + 1, seg));
            let (c, d) = (p(ring + 1, seg + 1), p(ring, seg + 1));
            if ring == 0 {
                out.push(Triangle::new(a, b, c));
            } else if ring == rings - 1 {
                out.push(Triangle::new(a, b, d));
            } else {
                out.push(Triangle::new(a, b, c));
                out.push(Triangle::new(a, c, d));
            }
        }
    }
    out
}

/// Deterministic generator for repeatable random rays.
pub struct TestRng(u64);

impl TestRng {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        // SplitMix64
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[-1, 1)`.
    pub fn signed_unit(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 23) as f32 - 1.0
    }

    /// Uniform direction on the unit sphere.
    pub fn direction(&mut self) -> Vec3 {
        loop {
            let v = Vec3::new(self.signed_unit(), self.signed_unit(), self.signed_unit());
            let len = v.norm();
            if len > 0.1 && len <= 1.0 {
                return v / len;
            }
        }
    }
}
