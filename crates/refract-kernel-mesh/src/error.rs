//! Error types for mesh extraction and import.

use thiserror::Error;

/// Errors raised while building a triangle buffer.
#[derive(Error, Debug)]
pub enum MeshError {
    /// Mesh has no triangles.
    #[error("mesh is empty")]
    EmptyMesh,

    /// Flat float buffer is not a whole number of triangles.
    #[error("triangle buffer length {0} is not a multiple of 9")]
    MalformedTriangles(usize),

    /// Vertex position buffer is not a whole number of vec3s.
    #[error("position buffer length {0} is not a multiple of 3")]
    MalformedPositions(usize),

    /// An index refers past the end of the vertex buffer.
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// Offending index.
        index: u32,
        /// Number of vertices available.
        vertex_count: usize,
    },

    /// STL data could not be parsed.
    #[error("invalid STL: {0}")]
    InvalidStl(String),
}

impl MeshError {
    /// Shorthand for an STL parse failure.
    pub fn stl(msg: impl Into<String>) -> Self {
        Self::InvalidStl(msg.into())
    }
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;
