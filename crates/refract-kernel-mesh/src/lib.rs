#![warn(missing_docs)]

//! Triangle input for the refract acceleration structures.
//!
//! Every structure in the kernel is built from a flat soup of world-space
//! triangles. This crate owns that representation and the geometric tests
//! the builders and traversals share:
//!
//! - [`Triangle`] with Möller–Trumbore ray intersection (two-sided and
//!   backface-culled) and a separating-axis triangle/box overlap test
//! - [`MeshNode`], a transform hierarchy flattened by the triangle extractor
//! - [`stl`] import/export

mod error;
mod hierarchy;
pub mod stl;
mod triangle;

pub use error::{MeshError, Result};
pub use hierarchy::MeshNode;
pub use triangle::{
    triangles_aabb, triangles_from_floats, triangles_to_floats, Triangle, FLOATS_PER_TRIANGLE,
};
