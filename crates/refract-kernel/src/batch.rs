//! Parallel batch ray casting.

use rayon::prelude::*;
use refract_kernel_raytrace::{Ray, RayCast, RayHit};

/// One ray with its parameter range.
#[derive(Debug, Clone, Copy)]
pub struct RayQuery {
    /// The ray.
    pub ray: Ray,
    /// Smallest accepted hit parameter.
    pub t_min: f32,
    /// Largest accepted hit parameter.
    pub t_max: f32,
}

impl RayQuery {
    /// Query over `[0, inf)`.
    pub fn new(ray: Ray) -> Self {
        Self {
            ray,
            t_min: 0.0,
            t_max: f32::INFINITY,
        }
    }

    /// Restrict the parameter range.
    pub fn with_range(mut self, t_min: f32, t_max: f32) -> Self {
        self.t_min = t_min;
        self.t_max = t_max;
        self
    }
}

/// Cast every query against `structure` in parallel. Results keep the
/// order of `queries`.
pub fn cast_rays<S>(structure: &S, queries: &[RayQuery]) -> Vec<Option<RayHit>>
where
    S: RayCast + ?Sized,
{
    queries
        .par_iter()
        .map(|q| structure.ray_cast(&q.ray, q.t_min, q.t_max))
        .collect()
}
