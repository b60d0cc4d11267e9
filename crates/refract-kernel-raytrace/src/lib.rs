#![warn(missing_docs)]

//! Ray casting through the refract acceleration structures.
//!
//! Every structure answers the same nearest-hit query through [`RayCast`],
//! so a renderer can swap between exact triangle geometry and voxel
//! approximations without changing its shading code.
//!
//! # Architecture
//!
//! - [`Ray`] - Ray representation with origin and direction
//! - [`RayHit`] - Hit parameter, point and surface normal
//! - [`sah`] - Surface area heuristic construction of [`LinearBvh`]
//! - [`bvh`] - Flattened BVH buffers and stack-based traversal
//! - [`svo`] - Octree march over a linearized sparse voxel octree
//! - [`grid`] - DDA walk over a dense voxel grid
//!
//! # Example
//!
//! ```ignore
//! use refract_kernel_raytrace::{BvhBuilder, RayCast, Ray, SahBuilder};
//!
//! let bvh = SahBuilder::default().build(&triangles)?;
//! let ray = Ray::new(Point3::new(0.3, 0.6, -5.0), Vec3::new(0.0, 0.0, 1.0));
//!
//! if let Some(hit) = bvh.ray_cast(&ray, 0.0, f32::INFINITY) {
//!     println!("hit at t = {}", hit.t);
//! }
//! ```

mod error;
mod ray;
pub mod bvh;
pub mod grid;
pub mod sah;
pub mod svo;

#[cfg(test)]
mod fixtures;

pub use bvh::{BvhBuilder, BvhNode, LinearBvh, TRAVERSAL_STACK_SIZE};
pub use error::{BvhError, Result};
pub use grid::{GridTraceOptions, GridTracer};
pub use ray::{Ray, RayCast, RayHit};
pub use sah::{BvhSettings, SahBuilder};
