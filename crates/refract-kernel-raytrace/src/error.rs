//! Error types for BVH construction and loading.

use thiserror::Error;

/// Errors that can occur while building or loading a linear BVH.
#[derive(Error, Debug)]
pub enum BvhError {
    /// Mesh has no triangles.
    #[error("mesh is empty")]
    EmptyMesh,

    /// Invalid build settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Buffer is shorter than its header requires.
    #[error("buffer truncated: expected {expected} bytes, found {actual}")]
    Truncated {
        /// Bytes required by the header.
        expected: usize,
        /// Bytes present.
        actual: usize,
    },

    /// Header fields are inconsistent.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A node references a child or primitive that does not exist.
    #[error("invalid node {index}: {reason}")]
    InvalidNode {
        /// Offending node.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },
}

impl BvhError {
    /// Shorthand for an invalid node.
    pub fn node(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidNode {
            index,
            reason: reason.into(),
        }
    }
}

/// Result type for BVH operations.
pub type Result<T> = std::result::Result<T, BvhError>;
