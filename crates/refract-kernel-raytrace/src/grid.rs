//! Ray casting through a dense voxel grid buffer.
//!
//! The ray is clipped to the grid and stepped cell by cell with a 3D DDA.
//! Average-normal grids report the first filled voxel the ray enters, so
//! their `t` is accurate to one voxel rather than to the surface.
//! Dual-contoured grids rebuild the quad dual to every crossed edge near a
//! visited voxel from the vertices of the four voxels sharing that edge and
//! intersect the ray with its two triangles.

use refract_kernel_math::{IVec3, Point3, Vec3};
use refract_kernel_mesh::Triangle;
use refract_kernel_voxel::grid_buffer::decode_flags;
use refract_kernel_voxel::voxelize::EDGE_OFFSETS;
use refract_kernel_voxel::{ContouringMethod, VoxelGridBuffer};
use serde::{Deserialize, Serialize};

use crate::ray::{Ray, RayCast, RayHit};

/// Upper bound on DDA steps per ray.
pub const MAX_GRID_STEPS: usize = 1000;

/// Voxels sharing each cube edge, as offsets from the voxel owning the
/// edge. The first three form one triangle and the last three the other,
/// which together span the quad dual to the edge.
const EDGE_NEIGHBOURS: [[[i32; 3]; 6]; 12] = [
    [[0, 0, 0], [-1, 0, 0], [-1, -1, 0], [0, 0, 0], [0, -1, 0], [-1, -1, 0]],
    [[0, 1, 0], [-1, 1, 0], [-1, 0, 0], [0, 1, 0], [0, 0, 0], [-1, 0, 0]],
    [[1, 0, 0], [0, 0, 0], [0, -1, 0], [1, 0, 0], [1, -1, 0], [0, -1, 0]],
    [[1, 1, 0], [0, 1, 0], [0, 0, 0], [1, 1, 0], [1, 0, 0], [0, 0, 0]],
    [[0, 0, 0], [0, 0, -1], [0, -1, -1], [0, 0, 0], [0, -1, 0], [0, -1, -1]],
    [[0, 1, 0], [0, 1, -1], [0, 0, -1], [0, 1, 0], [0, 0, 0], [0, 0, -1]],
    [[0, 0, 1], [0, 0, 0], [0, -1, 0], [0, 0, 1], [0, -1, 1], [0, -1, 0]],
    [[0, 1, 1], [0, 1, 0], [0, 0, 0], [0, 1, 1], [0, 0, 1], [0, 0, 0]],
    [[0, 0, -1], [0, 0, 0], [-1, 0, 0], [0, 0, -1], [-1, 0, -1], [-1, 0, 0]],
    [[1, 0, -1], [1, 0, 0], [0, 0, 0], [1, 0, -1], [0, 0, -1], [0, 0, 0]],
    [[0, 0, 0], [0, 0, 1], [-1, 0, 1], [0, 0, 0], [-1, 0, 0], [-1, 0, 1]],
    [[1, 0, 0], [1, 0, 1], [0, 0, 1], [1, 0, 0], [0, 0, 0], [0, 0, 1]],
];

/// Grid traversal options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridTraceOptions {
    /// The surface is convex: only rebuild the quads of each visited
    /// voxel's own crossed edges and return the first dual contouring hit.
    pub convex: bool,
}

/// A grid buffer paired with its traversal options.
///
/// Hits on average-normal grids lie on the entry face of the first filled
/// voxel, not on the averaged surface plane. Callers needing the surface
/// point should refine it themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct GridTracer {
    /// Grid to traverse.
    pub grid: VoxelGridBuffer,
    /// Traversal options.
    pub options: GridTraceOptions,
}

impl GridTracer {
    /// Wrap a grid.
    pub fn new(grid: VoxelGridBuffer, options: GridTraceOptions) -> Self {
        Self { grid, options }
    }
}

impl RayCast for GridTracer {
    fn ray_cast(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<RayHit> {
        ray_cast(&self.grid, ray, t_min, t_max, &self.options)
    }
}

impl RayCast for VoxelGridBuffer {
    fn ray_cast(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<RayHit> {
        ray_cast(self, ray, t_min, t_max, &GridTraceOptions::default())
    }
}

/// Incremental cell walk along a ray.
struct Dda {
    cell: IVec3,
    step: [i32; 3],
    next: Vec3,
    delta: Vec3,
}

impl Dda {
    fn new(grid: &VoxelGridBuffer, ray: &Ray, cell: IVec3) -> Self {
        let g = &grid.geometry;
        let mut step = [0; 3];
        let mut next = Vec3::repeat(f32::INFINITY);
        let mut delta = Vec3::repeat(f32::INFINITY);
        for axis in 0..3 {
            let d = ray.direction[axis];
            let lo = g.min[axis] + cell[axis] as f32 * g.voxel_size;
            if d > 0.0 {
                step[axis] = 1;
                next[axis] = (lo + g.voxel_size - ray.origin[axis]) / d;
                delta[axis] = g.voxel_size / d;
            } else if d < 0.0 {
                step[axis] = -1;
                next[axis] = (lo - ray.origin[axis]) / d;
                delta[axis] = -g.voxel_size / d;
            }
        }
        Self {
            cell,
            step,
            next,
            delta,
        }
    }

    /// Parameter at which the ray leaves the current cell.
    fn exit(&self) -> f32 {
        self.next.min()
    }

    /// Move to the next cell; returns the entry parameter and the crossed axis.
    fn advance(&mut self) -> Option<(f32, usize)> {
        let n = &self.next;
        let axis = if n.x < n.y && n.x < n.z {
            0
        } else if n.y < n.z {
            1
        } else {
            2
        };
        if self.step[axis] == 0 {
            return None;
        }
        let t = self.next[axis];
        self.cell[axis] += self.step[axis];
        self.next[axis] += self.delta[axis];
        Some((t, axis))
    }
}

/// Nearest surface hit in `[t_min, t_max]`.
///
/// For average-normal grids the voxel containing the ray origin is never
/// reported, so a ray starting on the surface finds the next surface; the
/// hit lies where the ray enters the voxel, not on the surface itself.
/// Dual-contoured grids search the quads around every visited voxel and
/// accept a hit only inside that voxel, so the first one found is the
/// nearest. With `options.convex` only the visited voxel's own quads are
/// tested and the first hit is returned. Exceeding [`MAX_GRID_STEPS`] is
/// a miss.
pub fn ray_cast(
    grid: &VoxelGridBuffer,
    ray: &Ray,
    t_min: f32,
    t_max: f32,
    options: &GridTraceOptions,
) -> Option<RayHit> {
    let bounds = grid.bounds();
    let (t0, t1) = ray.intersect_aabb(&bounds, t_min, t_max)?;
    let g = &grid.geometry;
    let dims = IVec3::new(g.dims[0] as i32, g.dims[1] as i32, g.dims[2] as i32);

    let origin_inside = t0 <= t_min;
    let start = g
        .cell_of(&ray.at(t0))
        .zip_map(&dims, |c, d| c.clamp(0, d - 1));
    let mut entry_axis = if origin_inside {
        None
    } else {
        ray.entry_axis(&bounds)
    };

    let slack = g.voxel_size * 1e-4 / ray.direction.norm();
    let mut dda = Dda::new(grid, ray, start);
    let mut t_entry = t0;

    for _ in 0..MAX_GRID_STEPS {
        if t_entry > t1 {
            break;
        }
        let Some(texel) = grid.texel(&dda.cell) else {
            break;
        };

        match grid.method {
            ContouringMethod::AverageNormals => {
                if decode_flags(texel[3]).0 && !(origin_inside && dda.cell == start) {
                    let stored = Vec3::new(texel[0], texel[1], texel[2]);
                    let normal = (-stored)
                        .try_normalize(1e-6)
                        .unwrap_or_else(|| ray.face_normal(entry_axis));
                    return Some(RayHit::new(t_entry, ray.at(t_entry), normal));
                }
            }
            ContouringMethod::DualContouring if options.convex => {
                let (filled, edges) = decode_flags(texel[3]);
                if filled {
                    if let Some(hit) = owned_contour_hit(grid, ray, &dda.cell, edges, t_min, t1) {
                        return Some(hit);
                    }
                }
            }
            ContouringMethod::DualContouring => {
                let lo = (t_entry - slack).max(t_min);
                let hi = (dda.exit() + slack).min(t1);
                if let Some(hit) = contour_hit(grid, ray, &dda.cell, lo, hi) {
                    return Some(hit);
                }
            }
        }

        let Some((t, axis)) = dda.advance() else {
            break;
        };
        t_entry = t;
        entry_axis = Some(axis);
    }
    None
}

/// Filled-voxel vertex at `cell`, `None` for empty or out-of-grid cells.
fn contour_vertex(grid: &VoxelGridBuffer, cell: &IVec3) -> Option<Point3> {
    let texel = grid.texel(cell)?;
    decode_flags(texel[3])
        .0
        .then(|| Point3::new(texel[0], texel[1], texel[2]))
}

/// Closest hit in `[t_min, t_max]` on the quad dual to `edge` of `cell`.
///
/// Triangles with a vertex in an empty or out-of-grid voxel are skipped.
fn quad_hit(
    grid: &VoxelGridBuffer,
    ray: &Ray,
    cell: &IVec3,
    edge: usize,
    t_min: f32,
    t_max: f32,
) -> Option<(f32, Triangle)> {
    let n = &EDGE_NEIGHBOURS[edge];
    let mut closest: Option<(f32, Triangle)> = None;
    for fan in [[n[0], n[1], n[2]], [n[3], n[5], n[4]]] {
        let vertex = |offset: [i32; 3]| contour_vertex(grid, &(cell + IVec3::from(offset)));
        let (Some(a), Some(b), Some(c)) = (vertex(fan[0]), vertex(fan[1]), vertex(fan[2]))
        else {
            continue;
        };
        let tri = Triangle::new(a, b, c);
        let Some(t) = tri.intersect_ray(&ray.origin, &ray.direction) else {
            continue;
        };
        if t >= t_min && t <= t_max && closest.map_or(true, |(best, _)| t < best) {
            closest = Some((t, tri));
        }
    }
    closest
}

fn to_hit(ray: &Ray, closest: Option<(f32, Triangle)>) -> Option<RayHit> {
    let (t, tri) = closest?;
    let normal = tri.normal()?;
    Some(RayHit::new(t, ray.at(t), normal))
}

/// Closest hit on the quads of the crossed edges stored in `cell` itself.
fn owned_contour_hit(
    grid: &VoxelGridBuffer,
    ray: &Ray,
    cell: &IVec3,
    edges: u32,
    t_min: f32,
    t_max: f32,
) -> Option<RayHit> {
    let mut closest: Option<(f32, Triangle)> = None;
    for edge in (0..12).filter(|e| edges & (1 << e) != 0) {
        let limit = closest.map_or(t_max, |(t, _)| t);
        if let Some(hit) = quad_hit(grid, ray, cell, edge, t_min, limit) {
            closest = Some(hit);
        }
    }
    to_hit(ray, closest)
}

/// Closest hit in `[t_min, t_max]` on any quad that can reach `cell`.
///
/// A quad spans the four voxels around its edge, so every crossed edge
/// flagged in the 3x3x3 block around `cell` is rebuilt once, from the voxel
/// at the edge's lowest corner.
fn contour_hit(
    grid: &VoxelGridBuffer,
    ray: &Ray,
    cell: &IVec3,
    t_min: f32,
    t_max: f32,
) -> Option<RayHit> {
    let mut seen: Vec<(IVec3, usize)> = Vec::new();
    let mut closest: Option<(f32, Triangle)> = None;

    for dz in -1..=1 {
        for dy in -1..=1 {
            for dx in -1..=1 {
                let neighbour = cell + IVec3::new(dx, dy, dz);
                let Some(texel) = grid.texel(&neighbour) else {
                    continue;
                };
                let (filled, edges) = decode_flags(texel[3]);
                if !filled || edges == 0 {
                    continue;
                }
                for edge in (0..12).filter(|e| edges & (1 << e) != 0) {
                    let [from, _] = EDGE_OFFSETS[edge];
                    let owner =
                        neighbour + IVec3::new(from[0] as i32, from[1] as i32, from[2] as i32);
                    // Edges 0, 4 and 8 start at their voxel's minimum corner.
                    let canonical = edge / 4 * 4;
                    if seen.contains(&(owner, canonical)) {
                        continue;
                    }
                    seen.push((owner, canonical));

                    let limit = closest.map_or(t_max, |(t, _)| t);
                    if let Some(hit) = quad_hit(grid, ray, &owner, canonical, t_min, limit) {
                        closest = Some(hit);
                    }
                }
            }
        }
    }
    to_hit(ray, closest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{unit_cube, wavy_sheet};
    use approx::assert_abs_diff_eq;
    use refract_kernel_voxel::{voxelize_mesh, GridSettings};

    fn cube_grid(grid_size: u32, method: ContouringMethod) -> VoxelGridBuffer {
        let settings = GridSettings {
            grid_size,
            method,
            ..Default::default()
        };
        VoxelGridBuffer::from(&voxelize_mesh(&unit_cube(), &settings).unwrap())
    }

    #[test]
    fn test_neighbour_quads_share_the_owner() {
        // The two fans share a diagonal and the owner is one of the four.
        for n in EDGE_NEIGHBOURS.iter() {
            assert_eq!(n[0], n[3]);
            assert_eq!(n[2], n[5]);
            assert!(n.iter().any(|o| *o == [0, 0, 0]));
        }
    }

    #[test]
    fn test_grid_average_normals_entry() {
        let grid = cube_grid(8, ContouringMethod::AverageNormals);
        let voxel = grid.geometry.voxel_size;
        let ray = Ray::new(Point3::new(0.37, 0.61, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = ray_cast(&grid, &ray, 0.0, f32::INFINITY, &Default::default()).unwrap();
        assert!((hit.point.z - 1.0).abs() <= voxel);
        assert_abs_diff_eq!(hit.normal.z, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(hit.t, 5.0 - hit.point.z, epsilon = 1e-5);
    }

    #[test]
    fn test_grid_skips_origin_voxel() {
        let grid = cube_grid(8, ContouringMethod::AverageNormals);
        let voxel = grid.geometry.voxel_size;
        // Start on the bottom face and look for the top one.
        let ray = Ray::new(Point3::new(0.37, 0.61, 0.0), Vec3::new(0.0, 0.0, 1.0));
        let hit = ray_cast(&grid, &ray, 0.0, f32::INFINITY, &Default::default()).unwrap();
        assert!((hit.point.z - 1.0).abs() <= voxel);
        assert!(hit.normal.z > 0.9);
    }

    #[test]
    fn test_grid_miss() {
        let grid = cube_grid(8, ContouringMethod::AverageNormals);
        let away = Ray::new(Point3::new(0.5, 0.5, 5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(ray_cast(&grid, &away, 0.0, f32::INFINITY, &Default::default()).is_none());
        let short = Ray::new(Point3::new(0.37, 0.61, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(ray_cast(&grid, &short, 0.0, 3.0, &Default::default()).is_none());
    }

    #[test]
    fn test_grid_dual_contouring_near_surface() {
        let grid = cube_grid(8, ContouringMethod::DualContouring);
        let voxel = grid.geometry.voxel_size;
        let ray = Ray::new(Point3::new(-3.0, 0.43, 0.58), Vec3::new(1.0, 0.0, 0.0));
        let hit = ray_cast(&grid, &ray, 0.0, f32::INFINITY, &Default::default()).unwrap();
        assert!(hit.point.x.abs() <= voxel);
        assert!(hit.normal.x.abs() > 0.9);

        let convex = GridTraceOptions { convex: true };
        let first = ray_cast(&grid, &ray, 0.0, f32::INFINITY, &convex).unwrap();
        assert!(first.t >= hit.t - 1e-6);
        assert!(first.point.x.abs() <= voxel);
    }

    #[test]
    fn test_grid_dual_contouring_follows_curved_sheet() {
        let sheet = wavy_sheet(16);
        let settings = GridSettings {
            grid_size: 32,
            method: ContouringMethod::DualContouring,
            ..Default::default()
        };
        let grid = VoxelGridBuffer::from(&voxelize_mesh(&sheet, &settings).unwrap());
        let diagonal = grid.geometry.voxel_size * 3f32.sqrt();

        for j in 0..7 {
            for i in 0..7 {
                let target = Point3::new(0.2 + i as f32 * 0.1, 0.2 + j as f32 * 0.1, 0.0);
                let origin = Point3::new(target.x - 0.13, target.y + 0.07, 1.5);
                let ray = Ray::new(origin, (target - origin).normalize());
                let exact = sheet
                    .iter()
                    .filter_map(|t| t.intersect_ray(&ray.origin, &ray.direction))
                    .fold(f32::INFINITY, f32::min);
                let hit = ray_cast(&grid, &ray, 0.0, f32::INFINITY, &Default::default())
                    .unwrap_or_else(|| panic!("missed the sheet at {target:?}"));
                assert!(
                    (hit.t - exact).abs() <= diagonal,
                    "t {} vs {exact} at {target:?}",
                    hit.t
                );
            }
        }
    }

    #[test]
    fn test_grid_tracer_uses_options() {
        let grid = cube_grid(4, ContouringMethod::AverageNormals);
        let tracer = GridTracer::new(grid.clone(), GridTraceOptions::default());
        let ray = Ray::new(Point3::new(0.3, 0.6, -2.0), Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(
            RayCast::ray_cast(&tracer, &ray, 0.0, 10.0),
            RayCast::ray_cast(&grid, &ray, 0.0, 10.0)
        );
    }
}
