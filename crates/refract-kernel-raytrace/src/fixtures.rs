//! Meshes shared by the unit tests.

use refract_kernel_math::Point3;
use refract_kernel_mesh::Triangle;

/// Unit cube with outward-facing winding.
pub(crate) fn unit_cube() -> Vec<Triangle> {
    let p = |x: f32, y: f32, z: f32| Point3::new(x, y, z);
    let quads = [
        [p(0., 0., 0.), p(0., 1., 0.), p(1., 1., 0.), p(1., 0., 0.)],
        [p(0., 0., 1.), p(1., 0., 1.), p(1., 1., 1.), p(0., 1., 1.)],
        [p(0., 0., 0.), p(1., 0., 0.), p(1., 0., 1.), p(0., 0., 1.)],
        [p(0., 1., 0.), p(0., 1., 1.), p(1., 1., 1.), p(1., 1., 0.)],
        [p(0., 0., 0.), p(0., 0., 1.), p(0., 1., 1.), p(0., 1., 0.)],
        [p(1., 0., 0.), p(1., 1., 0.), p(1., 1., 1.), p(1., 0., 1.)],
    ];
    quads
        .iter()
        .flat_map(|q| [Triangle::new(q[0], q[1], q[2]), Triangle::new(q[0], q[2], q[3])])
        .collect()
}

/// Height field over the unit square, `n x n` quads facing up.
pub(crate) fn wavy_sheet(n: usize) -> Vec<Triangle> {
    let step = 1.0 / n as f32;
    let p = |i: usize, j: usize| {
        let (x, y) = (i as f32 * step, j as f32 * step);
        Point3::new(x, y, 0.1 * (3.0 * x).sin() * (2.0 * y).cos())
    };
    let mut out = Vec::with_capacity(n * n * 2);
    for j in 0..n {
        for i in 0..n {
            out.push(Triangle::new(p(i, j), p(i + 1, j), p(i + 1, j + 1)));
            out.push(Triangle::new(p(i, j), p(i + 1, j + 1), p(i, j + 1)));
        }
    }
    out
}
