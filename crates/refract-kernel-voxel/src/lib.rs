#![warn(missing_docs)]

//! Voxel proxies for the refract kernel.
//!
//! Turns a triangle soup into the two voxel structures the traversals
//! consume:
//!
//! - a dense grid ([`voxelize_mesh`] → [`VoxelGrid`] → [`VoxelGridBuffer`])
//! - a sparse voxel octree ([`voxelize_mesh_svo`] → [`Svo`] → [`SvoBuffer`])
//!
//! Either stores per voxel the negated mean face normal or, with dual
//! contouring, a surface vertex found by the [`qef`] solver.
//!
//! # Example
//!
//! ```ignore
//! use refract_kernel_voxel::{voxelize_mesh, GridSettings, VoxelGridBuffer};
//!
//! let grid = voxelize_mesh(&triangles, &GridSettings::default())?;
//! let buffer = VoxelGridBuffer::from_grid(&grid);
//! std::fs::write("mesh.grid", buffer.to_bytes())?;
//! ```

mod error;
pub mod grid_buffer;
pub mod qef;
mod settings;
pub mod svo;
pub mod svo_buffer;
pub mod voxelize;

pub use error::{Result, VoxelError};
pub use grid_buffer::{Texel, VoxelGridBuffer};
pub use qef::{Qef, QefSolveSettings, QefSolution};
pub use settings::{GridSettings, SimplifySettings, SvoSettings, MAX_SVO_DEPTH};
pub use svo::{voxelize_mesh_svo, Svo, SvoNode};
pub use svo_buffer::{LinearSvoNode, SvoBuffer};
pub use voxelize::{voxelize, voxelize_mesh, ContouringMethod, GridGeometry, Voxel, VoxelGrid};
