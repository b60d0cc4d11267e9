//! Conservative triangle rasterization into a dense voxel grid.
//!
//! Every triangle is tested against the voxels covered by its vertex
//! cells with a separating-axis overlap test. Overlapping voxels either
//! accumulate the running mean of the negated face normals, or collect
//! Hermite samples on their 12 edges for a dual contouring solve.

use refract_kernel_math::{Aabb3, IVec3, Point3, Vec3};
use refract_kernel_mesh::{triangles_aabb, Triangle};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxelError};
use crate::qef::{Qef, QefSolveSettings};
use crate::settings::GridSettings;

/// Cube edges as pairs of unit-cube corners.
///
/// Edges 0-3 run along z, 4-7 along x, 8-11 along y.
pub const EDGE_OFFSETS: [[[u8; 3]; 2]; 12] = [
    [[0, 0, 0], [0, 0, 1]],
    [[0, 1, 0], [0, 1, 1]],
    [[1, 0, 0], [1, 0, 1]],
    [[1, 1, 0], [1, 1, 1]],
    [[0, 0, 0], [1, 0, 0]],
    [[0, 1, 0], [1, 1, 0]],
    [[0, 0, 1], [1, 0, 1]],
    [[0, 1, 1], [1, 1, 1]],
    [[0, 0, 0], [0, 1, 0]],
    [[1, 0, 0], [1, 1, 0]],
    [[0, 0, 1], [0, 1, 1]],
    [[1, 0, 1], [1, 1, 1]],
];

/// Bits of [`Voxel::edge_mask`] that mark crossed edges.
pub const EDGE_MASK_BITS: u32 = 0xFFF;

/// Edge `i` found its crossing from the far endpoint when bit
/// `EDGE_FLIP_SHIFT + i` is set. Informational only; never packed.
pub const EDGE_FLIP_SHIFT: u32 = 16;

/// What a filled voxel stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContouringMethod {
    /// Negated mean of the intersecting face normals.
    #[default]
    AverageNormals,
    /// Dual-contoured surface vertex.
    DualContouring,
}

impl ContouringMethod {
    /// Integer tag used in buffer headers.
    pub fn as_raw(self) -> u32 {
        match self {
            Self::AverageNormals => 0,
            Self::DualContouring => 1,
        }
    }

    /// Parse a header tag.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::AverageNormals),
            1 => Some(Self::DualContouring),
            _ => None,
        }
    }
}

/// Placement of a dense grid in world space.
///
/// Voxel `(x, y, z)` spans `min + (x, y, z) * voxel_size` to one voxel
/// further on each axis. Linear indices vary fastest in x.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    /// World-space corner of voxel `(0, 0, 0)`.
    pub min: Point3,
    /// Voxel counts per axis.
    pub dims: [u32; 3],
    /// Voxel edge length.
    pub voxel_size: f32,
}

impl GridGeometry {
    /// Create a grid placement.
    pub fn new(min: Point3, dims: [u32; 3], voxel_size: f32) -> Self {
        Self {
            min,
            dims,
            voxel_size,
        }
    }

    /// Fit a grid with `grid_size` voxels along the longest axis of
    /// `bounds`, padded by half a voxel on every side.
    ///
    /// The voxel size is the padded extent divided by `grid_size`, so the
    /// grid covers the padded bounds exactly. Sizing by `grid_size - 1`
    /// instead would leave a whole spare voxel on the longest axis and give
    /// buffers with a slightly larger voxel than this one.
    pub fn fit(bounds: &Aabb3, grid_size: u32) -> Self {
        let n = grid_size.max(1) as f32;
        let mut padded = *bounds;
        padded.expand(nonzero_extent(bounds) / n * 0.5);
        let voxel_size = padded.max_extent() / n;
        let extents = padded.extents();
        let dims = [0, 1, 2].map(|axis| ((extents[axis] / voxel_size - 1e-4).ceil() as u32).max(1));
        Self::new(padded.min, dims, voxel_size)
    }

    /// Fit a cubic `2^depth` grid around `bounds`, padded by half a voxel.
    pub fn cube(bounds: &Aabb3, depth: u32) -> Self {
        let n = 1u32 << depth;
        let mut padded = *bounds;
        padded.expand(nonzero_extent(bounds) / n as f32 * 0.5);
        let voxel_size = padded.max_extent() / n as f32;
        Self::new(padded.min, [n; 3], voxel_size)
    }

    /// Total voxel count.
    pub fn voxel_count(&self) -> usize {
        self.dims.iter().map(|&d| d as usize).product()
    }

    /// Total voxel count, `None` when it overflows `usize`.
    pub fn checked_voxel_count(&self) -> Option<usize> {
        self.dims
            .iter()
            .try_fold(1usize, |n, &d| n.checked_mul(d as usize))
    }

    /// Linear index of in-range coordinates.
    #[inline]
    pub fn index(&self, coords: [u32; 3]) -> usize {
        let [dx, dy, _] = self.dims.map(|d| d as usize);
        coords[0] as usize + dx * (coords[1] as usize + dy * coords[2] as usize)
    }

    /// Inverse of [`GridGeometry::index`].
    pub fn coords_of(&self, index: usize) -> [u32; 3] {
        let [dx, dy, _] = self.dims.map(|d| d as usize);
        [
            (index % dx) as u32,
            ((index / dx) % dy) as u32,
            (index / (dx * dy)) as u32,
        ]
    }

    /// Cell containing `p`; may lie outside the grid.
    pub fn cell_of(&self, p: &Point3) -> IVec3 {
        ((p - self.min) / self.voxel_size).map(|c| c.floor() as i32)
    }

    /// Minimum corner of a voxel.
    pub fn voxel_min(&self, coords: [u32; 3]) -> Point3 {
        self.min + Vec3::new(coords[0] as f32, coords[1] as f32, coords[2] as f32) * self.voxel_size
    }

    /// Center of a voxel.
    pub fn voxel_center(&self, coords: [u32; 3]) -> Point3 {
        self.voxel_min(coords) + Vec3::repeat(self.voxel_size * 0.5)
    }

    /// Bounds of a voxel.
    pub fn voxel_aabb(&self, coords: [u32; 3]) -> Aabb3 {
        let min = self.voxel_min(coords);
        Aabb3::new(min, min + Vec3::repeat(self.voxel_size))
    }

    /// Bounds of the whole grid.
    pub fn bounds(&self) -> Aabb3 {
        let size = Vec3::new(self.dims[0] as f32, self.dims[1] as f32, self.dims[2] as f32);
        Aabb3::new(self.min, self.min + size * self.voxel_size)
    }

    /// Inclusive range of in-grid cells covered by the triangle's vertex cells.
    fn candidate_range(&self, tri: &Triangle) -> Option<([u32; 3], [u32; 3])> {
        let cells = tri.vertices().map(|p| self.cell_of(&p));
        let mut lo = [0u32; 3];
        let mut hi = [0u32; 3];
        for axis in 0..3 {
            let min = cells.iter().map(|c| c[axis]).min()?;
            let max = cells.iter().map(|c| c[axis]).max()?;
            let last = self.dims[axis] as i32 - 1;
            if max < 0 || min > last {
                return None;
            }
            lo[axis] = min.max(0) as u32;
            hi[axis] = max.min(last) as u32;
        }
        Some((lo, hi))
    }
}

fn nonzero_extent(bounds: &Aabb3) -> f32 {
    let extent = bounds.max_extent();
    if extent > 0.0 {
        extent
    } else {
        1.0
    }
}

/// One dense grid cell.
#[derive(Debug, Clone, Default)]
pub struct Voxel {
    /// Number of triangles that overlap this voxel; zero means empty.
    pub child_count: u32,
    /// Negated mean normal, or the dual contouring vertex relative to the
    /// voxel center.
    pub payload: Vec3,
    /// Crossed edges (bits 0-11) and their flip bits.
    pub edge_mask: u32,
    /// Hermite samples collected for dual contouring.
    pub qef: Qef,
}

impl Voxel {
    /// True when at least one triangle overlaps the voxel.
    pub fn is_filled(&self) -> bool {
        self.child_count > 0
    }

    /// Crossed-edge bits without flip information.
    pub fn edges(&self) -> u32 {
        self.edge_mask & EDGE_MASK_BITS
    }
}

/// A finalized dense voxel grid.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    /// World placement.
    pub geometry: GridGeometry,
    /// Payload kind.
    pub method: ContouringMethod,
    /// Voxels in [`GridGeometry::index`] order.
    pub voxels: Vec<Voxel>,
}

impl VoxelGrid {
    /// Voxel at `coords`, `None` outside the grid.
    pub fn get(&self, coords: [u32; 3]) -> Option<&Voxel> {
        if (0..3).any(|axis| coords[axis] >= self.geometry.dims[axis]) {
            return None;
        }
        self.voxels.get(self.geometry.index(coords))
    }

    /// Filled voxels with their coordinates.
    pub fn filled(&self) -> impl Iterator<Item = ([u32; 3], &Voxel)> + '_ {
        self.voxels
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_filled())
            .map(|(i, v)| (self.geometry.coords_of(i), v))
    }

    /// Number of filled voxels.
    pub fn filled_count(&self) -> usize {
        self.voxels.iter().filter(|v| v.is_filled()).count()
    }

    /// Payload as consumed by the traversals: the stored normal, or the
    /// contoured vertex in world space.
    pub fn world_payload(&self, coords: [u32; 3], voxel: &Voxel) -> Vec3 {
        match self.method {
            ContouringMethod::AverageNormals => voxel.payload,
            ContouringMethod::DualContouring => {
                self.geometry.voxel_center(coords).coords + voxel.payload
            }
        }
    }
}

/// Rasterize `triangles` into the grid described by `geometry`.
///
/// Degenerate triangles are skipped. Triangles outside the grid are ignored.
pub fn voxelize(
    triangles: &[Triangle],
    geometry: GridGeometry,
    method: ContouringMethod,
    qef: &QefSolveSettings,
) -> VoxelGrid {
    let mut voxels = vec![Voxel::default(); geometry.voxel_count()];
    let mut skipped = 0usize;

    let mut touched = Vec::new();
    for tri in triangles {
        let Some(normal) = tri.normal() else {
            skipped += 1;
            continue;
        };
        let Some((lo, hi)) = geometry.candidate_range(tri) else {
            continue;
        };

        touched.clear();
        for z in lo[2]..=hi[2] {
            for y in lo[1]..=hi[1] {
                for x in lo[0]..=hi[0] {
                    let coords = [x, y, z];
                    if tri.overlaps_aabb(&geometry.voxel_aabb(coords)) {
                        touched.push(geometry.index(coords));
                    }
                }
            }
        }
        if method == ContouringMethod::DualContouring {
            record_edge_crossings(&mut voxels, &mut touched, &geometry, tri, &normal, lo, hi);
            touched.sort_unstable();
            touched.dedup();
        }

        for &index in &touched {
            let voxel = &mut voxels[index];
            let n = voxel.child_count as f32;
            voxel.child_count += 1;
            if method == ContouringMethod::AverageNormals {
                voxel.payload = (voxel.payload * n - normal) / (n + 1.0);
            }
        }
    }

    if skipped > 0 {
        log::debug!("skipped {skipped} degenerate triangles");
    }

    if method == ContouringMethod::DualContouring {
        let solve = QefSolveSettings {
            boundary_size: geometry.voxel_size,
            ..*qef
        };
        let mut without_samples = 0usize;
        for voxel in voxels.iter_mut().filter(|v| v.is_filled()) {
            if voxel.qef.is_empty() {
                without_samples += 1;
            }
            voxel.payload = voxel.qef.solve_bounded(&solve).point;
        }
        if without_samples > 0 {
            log::debug!("{without_samples} filled voxels had no edge crossings");
        }
    }

    let grid = VoxelGrid {
        geometry,
        method,
        voxels,
    };
    log::debug!(
        "voxelized {} triangles into {:?} grid, {} filled",
        triangles.len(),
        geometry.dims,
        grid.filled_count()
    );
    grid
}

/// Fit a grid to the mesh bounds and voxelize it.
pub fn voxelize_mesh(triangles: &[Triangle], settings: &GridSettings) -> Result<VoxelGrid> {
    settings.validate()?;
    let bounds = triangles_aabb(triangles).ok_or(VoxelError::EmptyMesh)?;
    let geometry = GridGeometry::fit(&bounds, settings.grid_size);
    Ok(voxelize(triangles, geometry, settings.method, &settings.qef))
}

/// Cast every lattice edge in the triangle's cell range against it, first
/// from the start corner and then back from the end corner.
///
/// A crossing is recorded once per physical edge and lands in all in-grid
/// voxels sharing that edge, so the four voxels always agree on it. Those
/// voxels are appended to `touched`.
fn record_edge_crossings(
    voxels: &mut [Voxel],
    touched: &mut Vec<usize>,
    geometry: &GridGeometry,
    tri: &Triangle,
    normal: &Vec3,
    lo: [u32; 3],
    hi: [u32; 3],
) {
    let size = geometry.voxel_size;
    let within = |t: &f32| (0.0..=size).contains(t);

    for axis in 0..3 {
        let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
        let mut dir = Vec3::zeros();
        dir[axis] = 1.0;

        for pa in lo[axis]..=hi[axis] {
            for pu in lo[u]..=hi[u] + 1 {
                for pv in lo[v]..=hi[v] + 1 {
                    let mut lattice = [0u32; 3];
                    lattice[axis] = pa;
                    lattice[u] = pu;
                    lattice[v] = pv;
                    let a = geometry.voxel_min(lattice);
                    let b = a + dir * size;

                    let (hit, flipped) = match tri.intersect_ray_front(&a, &dir).filter(within) {
                        Some(t) => (a + dir * t, false),
                        None => match tri.intersect_ray_front(&b, &-dir).filter(within) {
                            Some(t) => (b - dir * t, true),
                            None => continue,
                        },
                    };

                    for (du, dv) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                        if pu < du || pv < dv {
                            continue;
                        }
                        let mut coords = lattice;
                        coords[u] -= du;
                        coords[v] -= dv;
                        if coords[u] >= geometry.dims[u] || coords[v] >= geometry.dims[v] {
                            continue;
                        }
                        let mut from = [0u8; 3];
                        from[u] = du as u8;
                        from[v] = dv as u8;
                        let Some(edge) = edge_index(axis, from) else {
                            continue;
                        };

                        let index = geometry.index(coords);
                        let voxel = &mut voxels[index];
                        voxel.edge_mask |= 1 << edge;
                        if flipped {
                            voxel.edge_mask |= 1 << (EDGE_FLIP_SHIFT + edge as u32);
                        }
                        let center = geometry.voxel_center(coords);
                        voxel.qef.add_intersection(hit - center, -normal, Some(edge as u8));
                        touched.push(index);
                    }
                }
            }
        }
    }
}

/// Index into [`EDGE_OFFSETS`] of the edge along `axis` starting at `from`.
fn edge_index(axis: usize, from: [u8; 3]) -> Option<usize> {
    EDGE_OFFSETS.iter().position(|[start, end]| {
        *start == from && (0..3).all(|i| end[i] == from[i] + (i == axis) as u8)
    })
}

fn corner(offset: &[u8; 3]) -> Vec3 {
    Vec3::new(offset[0] as f32, offset[1] as f32, offset[2] as f32)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

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

    fn cube_settings(method: ContouringMethod) -> GridSettings {
        GridSettings {
            grid_size: 4,
            method,
            ..Default::default()
        }
    }

    #[test]
    fn test_cube_winding_is_outward() {
        for tri in unit_cube() {
            let outward = tri.centroid() - Point3::new(0.5, 0.5, 0.5);
            assert!(tri.normal().unwrap().dot(&outward) > 0.0);
        }
    }

    #[test]
    fn test_fit_pads_half_voxel() {
        let bounds = Aabb3::new(Point3::origin(), Point3::new(1.0, 0.5, 1.0));
        let g = GridGeometry::fit(&bounds, 4);
        assert_eq!(g.dims, [4, 2, 4]);
        assert_abs_diff_eq!(g.voxel_size, 0.3125, epsilon = 1e-6);
        assert_abs_diff_eq!(g.min.x, -0.125, epsilon = 1e-6);
    }

    #[test]
    fn test_index_round_trip() {
        let g = GridGeometry::new(Point3::origin(), [3, 4, 5], 1.0);
        for i in 0..g.voxel_count() {
            assert_eq!(g.index(g.coords_of(i)), i);
        }
        assert_eq!(g.index([1, 2, 3]), 1 + 3 * (2 + 4 * 3));
    }

    #[test]
    fn test_cube_shell() {
        let grid = voxelize_mesh(&unit_cube(), &cube_settings(ContouringMethod::AverageNormals))
            .unwrap();
        assert_eq!(grid.geometry.dims, [4, 4, 4]);
        assert_eq!(grid.filled_count(), 64 - 8);
        for z in 1..3 {
            for y in 1..3 {
                for x in 1..3 {
                    assert!(!grid.get([x, y, z]).unwrap().is_filled());
                }
            }
        }
    }

    #[test]
    fn test_face_voxel_normal_points_inward() {
        let grid = voxelize_mesh(&unit_cube(), &cube_settings(ContouringMethod::AverageNormals))
            .unwrap();
        // Middle of the z = 0 face touches only the bottom triangles.
        let v = grid.get([1, 1, 0]).unwrap();
        assert_abs_diff_eq!(v.payload.z, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_repeated_normal_is_idempotent() {
        let tri = Triangle::new(
            Point3::new(0.1, 0.2, 0.3),
            Point3::new(0.9, 0.1, 0.5),
            Point3::new(0.4, 0.8, 0.6),
        );
        let n = tri.normal().unwrap();
        let geometry = GridGeometry::new(Point3::origin(), [1, 1, 1], 1.0);
        for k in 1..6 {
            let tris = vec![tri; k];
            let grid = voxelize(
                &tris,
                geometry,
                ContouringMethod::AverageNormals,
                &QefSolveSettings::default(),
            );
            let v = &grid.voxels[0];
            assert_eq!(v.child_count, k as u32);
            assert_abs_diff_eq!(v.payload.x, -n.x, epsilon = 1e-6);
            assert_abs_diff_eq!(v.payload.y, -n.y, epsilon = 1e-6);
            assert_abs_diff_eq!(v.payload.z, -n.z, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_dual_contouring_plane() {
        let tri = Triangle::new(
            Point3::new(-1.0, -1.0, 0.4),
            Point3::new(5.0, -1.0, 0.4),
            Point3::new(-1.0, 5.0, 0.4),
        );
        let geometry = GridGeometry::new(Point3::origin(), [1, 1, 1], 1.0);
        let grid = voxelize(
            &[tri],
            geometry,
            ContouringMethod::DualContouring,
            &QefSolveSettings::default(),
        );
        let v = &grid.voxels[0];
        assert_eq!(v.edges(), 0b1111);
        // Upward-facing plane is only seen by the downward edge rays.
        assert_eq!(v.edge_mask >> EDGE_FLIP_SHIFT, 0b1111);
        assert_eq!(v.qef.len(), 4);
        assert_abs_diff_eq!(v.payload.z, -0.1, epsilon = 1e-5);
        let world = grid.world_payload([0, 0, 0], v);
        assert_abs_diff_eq!(world.x, 0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(world.z, 0.4, epsilon = 1e-5);
    }

    #[test]
    fn test_dual_contouring_contained() {
        let grid = voxelize_mesh(&unit_cube(), &cube_settings(ContouringMethod::DualContouring))
            .unwrap();
        let h = grid.geometry.voxel_size * 0.5;
        for (_, v) in grid.filled() {
            assert!(v.payload.iter().all(|c| c.abs() <= h + 1e-6), "{:?}", v.payload);
        }
    }

    /// Octahedron around the unit cube center; no face is axis aligned.
    fn octahedron() -> Vec<Triangle> {
        let c = Point3::new(0.5, 0.5, 0.5);
        let r = 0.43;
        let axes = [Vec3::x(), Vec3::y(), Vec3::z()];
        let mut out = Vec::new();
        for sx in [-1.0f32, 1.0] {
            for sy in [-1.0f32, 1.0] {
                for sz in [-1.0f32, 1.0] {
                    let a = c + axes[0] * sx * r;
                    let b = c + axes[1] * sy * r;
                    let d = c + axes[2] * sz * r;
                    if sx * sy * sz > 0.0 {
                        out.push(Triangle::new(a, b, d));
                    } else {
                        out.push(Triangle::new(a, d, b));
                    }
                }
            }
        }
        out
    }

    #[test]
    fn test_shared_edges_agree() {
        let grid = voxelize_mesh(
            &octahedron(),
            &GridSettings {
                grid_size: 9,
                method: ContouringMethod::DualContouring,
                ..Default::default()
            },
        )
        .unwrap();
        let dims = grid.geometry.dims;
        let mut crossed = 0;
        for (coords, voxel) in grid.filled() {
            for edge in (0..12).filter(|e| voxel.edges() & (1 << e) != 0) {
                crossed += 1;
                let [from, to] = EDGE_OFFSETS[edge];
                let axis = (0..3).find(|&i| to[i] != from[i]).unwrap();
                let lattice = [0, 1, 2].map(|i| coords[i] + from[i] as u32);
                let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
                for (du, dv) in [(0u32, 0u32), (1, 0), (0, 1), (1, 1)] {
                    if lattice[u] < du || lattice[v] < dv {
                        continue;
                    }
                    let mut other = lattice;
                    other[u] -= du;
                    other[v] -= dv;
                    if other[u] >= dims[u] || other[v] >= dims[v] {
                        continue;
                    }
                    let mut start = [0u8; 3];
                    start[u] = du as u8;
                    start[v] = dv as u8;
                    let shared = edge_index(axis, start).unwrap();
                    let neighbour = grid.get(other).unwrap();
                    assert!(neighbour.is_filled(), "{other:?} shares edge {edge} of {coords:?}");
                    assert!(
                        neighbour.edges() & (1 << shared) != 0,
                        "{other:?} lacks edge {shared} shared with {coords:?}"
                    );
                }
            }
        }
        assert!(crossed > 0);
    }

    #[test]
    fn test_edge_index_matches_offsets() {
        for (edge, [from, to]) in EDGE_OFFSETS.iter().enumerate() {
            let axis = (0..3).find(|&i| to[i] != from[i]).unwrap();
            assert_eq!(edge_index(axis, *from), Some(edge));
        }
        assert_eq!(edge_index(0, [1, 0, 0]), None);
    }

    #[test]
    fn test_empty_mesh_rejected() {
        assert!(matches!(
            voxelize_mesh(&[], &GridSettings::default()),
            Err(VoxelError::EmptyMesh)
        ));
    }

    #[test]
    fn test_method_raw() {
        for m in [ContouringMethod::AverageNormals, ContouringMethod::DualContouring] {
            assert_eq!(ContouringMethod::from_raw(m.as_raw()), Some(m));
        }
        assert_eq!(ContouringMethod::from_raw(7), None);
    }
}
