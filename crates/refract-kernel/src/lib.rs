#![warn(missing_docs)]

//! Spatial acceleration structures for refractive rendering.
//!
//! Provides the [`AccelBuilder`] service, which turns a triangle soup into a
//! BVH, a dense voxel grid or a sparse voxel octree, and the
//! [`AccelStructure`] type a renderer casts rays against.
//!
//! # Example
//!
//! ```
//! use refract_kernel::{AccelBuilder, RayCast, StructureKind};
//! use refract_kernel::refract_kernel_math::{Point3, Vec3};
//! use refract_kernel::refract_kernel_mesh::Triangle;
//! use refract_kernel::refract_kernel_raytrace::Ray;
//!
//! let tri = Triangle::new(
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! );
//! let bvh = AccelBuilder::default().build(StructureKind::Bvh, &[tri]).unwrap();
//!
//! let ray = Ray::new(Point3::new(0.2, 0.2, 1.0), Vec3::new(0.0, 0.0, -1.0));
//! let hit = bvh.ray_cast(&ray, 0.0, f32::INFINITY).unwrap();
//! assert!((hit.t - 1.0).abs() < 1e-5);
//! ```

pub use refract_kernel_math;
pub use refract_kernel_mesh;
pub use refract_kernel_raytrace;
pub use refract_kernel_voxel;

mod batch;
mod builder;
mod error;
mod settings;
mod slot;
mod structure;

pub use batch::{cast_rays, RayQuery};
pub use builder::{AccelBuilder, BuildHandle};
pub use error::{KernelError, Result};
pub use refract_kernel_raytrace::{RayCast, RayHit};
pub use settings::BuildSettings;
pub use slot::StructureSlot;
pub use structure::{AccelStructure, StructureKind};
