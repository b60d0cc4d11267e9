//! Error types for the kernel facade.

use refract_kernel_mesh::MeshError;
use refract_kernel_raytrace::BvhError;
use refract_kernel_voxel::VoxelError;
use thiserror::Error;

/// Errors raised while configuring, building or loading structures.
#[derive(Error, Debug)]
pub enum KernelError {
    /// Triangle extraction or mesh import failed.
    #[error(transparent)]
    Mesh(#[from] MeshError),

    /// Voxel grid or octree construction or parsing failed.
    #[error(transparent)]
    Voxel(#[from] VoxelError),

    /// BVH construction or parsing failed.
    #[error(transparent)]
    Bvh(#[from] BvhError),

    /// Build settings could not be parsed.
    #[error("invalid build config: {0}")]
    Config(#[from] toml::de::Error),

    /// Structure kind name not recognised.
    #[error("unknown structure kind '{0}' (expected bvh, grid or svo)")]
    UnknownKind(String),

    /// A background build thread panicked.
    #[error("build worker panicked")]
    WorkerPanicked,
}

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;
