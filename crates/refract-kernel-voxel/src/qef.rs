//! Quadratic error function minimization for dual contouring.
//!
//! A [`Qef`] collects Hermite samples (surface point + normal) in
//! voxel-local coordinates. Each sample contributes a plane row
//! `n . x = n . p` to an overdetermined system `A x = b`, solved in the
//! least-squares sense through an eigen-decomposed pseudo-inverse of
//! `AᵀA`. Eigenvalues below [`EIGEN_CUTOFF`] are dropped, which keeps
//! flat and edge-like sample sets from shooting the vertex off along the
//! unconstrained directions.
//!
//! [`Qef::solve_bounded`] adds the cube constraint. It is a progressive
//! search, not a general constrained solver: unconstrained minimum first,
//! then the 6 face-restricted minima, then the 12 edge-restricted minima,
//! then the 8 corners.

use nalgebra::{DMatrix, DVector};
use refract_kernel_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxelError};

/// Eigenvalues of `AᵀA` below this are treated as zero.
pub const EIGEN_CUTOFF: f32 = 1e-3;

const BOUNDS_TOLERANCE: f32 = 1e-5;

/// One surface crossing: point and outward-facing normal, in voxel-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HermiteSample {
    /// Crossing point relative to the voxel center.
    pub point: Vec3,
    /// Plane normal at the crossing.
    pub normal: Vec3,
    /// Cube edge (0..12) the crossing was found on, if any.
    pub edge: Option<u8>,
}

/// Options for [`Qef::solve_bounded`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QefSolveSettings {
    /// Add three axis-aligned rows through the sample mean.
    pub add_bias: bool,
    /// Magnitude of the bias rows.
    pub bias_strength: f32,
    /// Search the cube faces, edges and corners when the free minimum is outside.
    pub constrain_boundaries: bool,
    /// Clamp the final point into the cube.
    pub clip_to_bounds: bool,
    /// Edge length of the cube centered on the origin. The voxelizer
    /// replaces it with the voxel size.
    pub boundary_size: f32,
}

impl Default for QefSolveSettings {
    fn default() -> Self {
        Self {
            add_bias: true,
            bias_strength: 1.0,
            constrain_boundaries: true,
            clip_to_bounds: true,
            boundary_size: 1.0,
        }
    }
}

impl QefSolveSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.add_bias && (self.bias_strength <= 0.0 || !self.bias_strength.is_finite()) {
            return Err(VoxelError::settings("bias_strength must be positive"));
        }
        if self.boundary_size <= 0.0 || !self.boundary_size.is_finite() {
            return Err(VoxelError::settings("boundary_size must be positive"));
        }
        Ok(())
    }
}

/// A minimizer and its residual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QefSolution {
    /// Minimizing point.
    pub point: Vec3,
    /// Sum of squared plane distances at `point`.
    pub error: f32,
}

/// Accumulated Hermite samples for one voxel.
#[derive(Debug, Clone, Default)]
pub struct Qef {
    samples: Vec<HermiteSample>,
}

impl Qef {
    /// Create an empty QEF.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample.
    pub fn add_intersection(&mut self, point: Vec3, normal: Vec3, edge: Option<u8>) {
        self.samples.push(HermiteSample { point, normal, edge });
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no sample has been added.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in insertion order.
    pub fn samples(&self) -> &[HermiteSample] {
        &self.samples
    }

    /// Mean of the sample points.
    pub fn mass_point(&self) -> Option<Vec3> {
        if self.samples.is_empty() {
            return None;
        }
        let sum = self.samples.iter().fold(Vec3::zeros(), |acc, s| acc + s.point);
        Some(sum / self.samples.len() as f32)
    }

    /// `Σ (n . (p - sample))²` over the samples.
    pub fn evaluate(&self, p: &Vec3) -> f32 {
        self.samples
            .iter()
            .map(|s| s.normal.dot(&(p - s.point)).powi(2))
            .sum()
    }

    /// The full 3-column system, optionally with bias rows of the given strength.
    pub fn system(&self, bias: Option<f32>) -> QefSystem {
        let mut planes: Vec<(Vec3, f32)> = self
            .samples
            .iter()
            .map(|s| (s.normal, s.normal.dot(&s.point)))
            .collect();
        if let (Some(strength), Some(mean)) = (bias, self.mass_point()) {
            for axis in 0..3 {
                let mut n = Vec3::zeros();
                n[axis] = strength;
                planes.push((n, strength * mean[axis]));
            }
        }
        QefSystem::new(planes)
    }

    /// Unconstrained least-squares minimizer, `None` without samples.
    pub fn solve(&self) -> Option<QefSolution> {
        (!self.is_empty()).then(|| self.system(None).solve())
    }

    /// Boundary-constrained solve.
    ///
    /// Without samples the voxel center (the origin) is returned with zero error.
    pub fn solve_bounded(&self, settings: &QefSolveSettings) -> QefSolution {
        if self.is_empty() {
            return QefSolution {
                point: Vec3::zeros(),
                error: 0.0,
            };
        }

        let system = self.system(settings.add_bias.then_some(settings.bias_strength));
        let h = settings.boundary_size * 0.5;
        let inside = |p: &Vec3| p.iter().all(|c| c.abs() <= h + BOUNDS_TOLERANCE);

        let mut best = system.solve();
        if settings.constrain_boundaries && !inside(&best.point) {
            best = boundary_search(&system, h, inside);
        }
        if settings.clip_to_bounds {
            let point = best.point.map(|c| c.clamp(-h, h));
            best = QefSolution {
                point,
                error: system.error(&point),
            };
        }
        best
    }
}

fn boundary_search(system: &QefSystem, h: f32, inside: impl Fn(&Vec3) -> bool) -> QefSolution {
    let lowest_inside = |candidates: Vec<QefSolution>| {
        candidates
            .into_iter()
            .filter(|s| inside(&s.point))
            .min_by(|a, b| a.error.total_cmp(&b.error))
    };

    let faces = (0..3)
        .flat_map(|axis| [-h, h].map(|v| system.fix_axis(axis, v).solve()))
        .collect();
    if let Some(best) = lowest_inside(faces) {
        log::trace!("qef: face solution");
        return best;
    }

    let mut edges = Vec::with_capacity(12);
    for (a0, a1) in [(0, 1), (0, 2), (1, 2)] {
        for v0 in [-h, h] {
            for v1 in [-h, h] {
                edges.push(system.fix_axis(a0, v0).fix_axis(a1, v1).solve());
            }
        }
    }
    if let Some(best) = lowest_inside(edges) {
        log::trace!("qef: edge solution");
        return best;
    }

    log::trace!("qef: corner solution");
    (0..8)
        .map(|i| {
            let corner = |bit: usize| if i & bit != 0 { h } else { -h };
            let point = Vec3::new(corner(1), corner(2), corner(4));
            QefSolution {
                point,
                error: system.error(&point),
            }
        })
        .min_by(|a, b| a.error.total_cmp(&b.error))
        .unwrap_or(QefSolution {
            point: Vec3::zeros(),
            error: system.error(&Vec3::zeros()),
        })
}

/// A plane system with zero or more axes held fixed.
///
/// Columns of `A` correspond to the free axes in ascending order. Fixing an
/// axis moves its contribution to the right-hand side and drops the column.
#[derive(Debug, Clone)]
pub struct QefSystem {
    a: DMatrix<f32>,
    b: DVector<f32>,
    free: Vec<usize>,
    fixed: [Option<f32>; 3],
    planes: Vec<(Vec3, f32)>,
}

impl QefSystem {
    fn new(planes: Vec<(Vec3, f32)>) -> Self {
        let a = DMatrix::from_fn(planes.len(), 3, |r, c| planes[r].0[c]);
        let b = DVector::from_fn(planes.len(), |r, _| planes[r].1);
        Self {
            a,
            b,
            free: vec![0, 1, 2],
            fixed: [None; 3],
            planes,
        }
    }

    /// Axes still solved for.
    pub fn free_axes(&self) -> &[usize] {
        &self.free
    }

    /// A reduced system with `axis` held at `value`.
    ///
    /// Fixing an axis that is already fixed returns an unchanged copy.
    pub fn fix_axis(&self, axis: usize, value: f32) -> QefSystem {
        let mut out = self.clone();
        let Some(col) = self.free.iter().position(|&a| a == axis) else {
            return out;
        };
        out.b -= self.a.column(col) * value;
        out.a = self.a.clone().remove_column(col);
        out.free.remove(col);
        out.fixed[axis] = Some(value);
        out
    }

    /// Sum of squared plane residuals at `p`, bias rows included.
    pub fn error(&self, p: &Vec3) -> f32 {
        self.planes
            .iter()
            .map(|(n, d)| (n.dot(p) - d).powi(2))
            .sum()
    }

    /// Pseudo-inverse least-squares solve over the free axes.
    pub fn solve(&self) -> QefSolution {
        let mut point = Vec3::zeros();
        for (axis, value) in self.fixed.iter().enumerate() {
            if let Some(v) = value {
                point[axis] = *v;
            }
        }

        if !self.free.is_empty() {
            let at = self.a.transpose();
            let ata = &at * &self.a;
            let atb = &at * &self.b;
            let eigen = ata.symmetric_eigen();
            let inv = eigen
                .eigenvalues
                .map(|l| if l < EIGEN_CUTOFF { 0.0 } else { 1.0 / l });
            let pinv = &eigen.eigenvectors
                * DMatrix::from_diagonal(&inv)
                * eigen.eigenvectors.transpose();
            let x = pinv * atb;
            for (i, &axis) in self.free.iter().enumerate() {
                point[axis] = x[i];
            }
        }

        QefSolution {
            point,
            error: self.error(&point),
        }
    }
}
