//! Error types for voxel structures.

use thiserror::Error;

/// Errors that can occur while building or loading voxel structures.
#[derive(Error, Debug)]
pub enum VoxelError {
    /// Mesh has no triangles.
    #[error("mesh is empty")]
    EmptyMesh,

    /// Invalid build settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Buffer is shorter than its header requires.
    #[error("buffer truncated: expected {expected} floats, found {actual}")]
    Truncated {
        /// Floats required by the header.
        expected: usize,
        /// Floats present.
        actual: usize,
    },

    /// Header fields are inconsistent.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A child offset does not fit in the 23 header bits.
    #[error("child offset {0} does not fit in 23 bits")]
    OffsetOverflow(u32),
}

impl VoxelError {
    /// Shorthand for an invalid header.
    pub fn header(msg: impl Into<String>) -> Self {
        Self::InvalidHeader(msg.into())
    }

    /// Shorthand for invalid settings.
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::InvalidSettings(msg.into())
    }
}

/// Result type for voxel operations.
pub type Result<T> = std::result::Result<T, VoxelError>;
