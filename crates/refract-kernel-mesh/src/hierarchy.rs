//! Mesh hierarchy and the triangle extractor.

use refract_kernel_math::{Point3, Transform};

use crate::error::{MeshError, Result};
use crate::triangle::{triangles_to_floats, Triangle};

/// A node in a mesh hierarchy.
///
/// `positions` holds packed `xyz` vertex coordinates in the node's local
/// frame. When `indices` is `None` the positions are already a triangle
/// list. `transform` maps local coordinates into the parent's frame.
#[derive(Debug, Clone, Default)]
pub struct MeshNode {
    /// Packed vertex positions (3 floats per vertex).
    pub positions: Vec<f32>,
    /// Optional triangle indices (3 per triangle).
    pub indices: Option<Vec<u32>>,
    /// Local-to-parent transform.
    pub transform: Transform,
    /// Child nodes.
    pub children: Vec<MeshNode>,
}

impl MeshNode {
    /// A leaf node with non-indexed geometry.
    pub fn from_positions(positions: Vec<f32>) -> Self {
        Self {
            positions,
            ..Default::default()
        }
    }

    /// A leaf node with indexed geometry.
    pub fn indexed(positions: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices: Some(indices),
            ..Default::default()
        }
    }

    /// An empty grouping node.
    pub fn group(children: Vec<MeshNode>) -> Self {
        Self {
            children,
            ..Default::default()
        }
    }

    /// Set the local transform.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Flatten the hierarchy into world-space triangles.
    ///
    /// Nodes are visited depth-first, parents before children. Indexed
    /// geometry is expanded; a trailing partial triangle is ignored.
    pub fn extract_triangles(&self) -> Result<Vec<Triangle>> {
        let mut out = Vec::new();
        self.extract_into(&Transform::identity(), &mut out)?;
        log::debug!("extracted {} triangles", out.len());
        Ok(out)
    }

    /// Flatten the hierarchy into the 9-floats-per-triangle buffer layout.
    pub fn extract_triangle_floats(&self) -> Result<Vec<f32>> {
        Ok(triangles_to_floats(&self.extract_triangles()?))
    }

    fn extract_into(&self, parent: &Transform, out: &mut Vec<Triangle>) -> Result<()> {
        let world = parent.then(&self.transform);

        if self.positions.len() % 3 != 0 {
            return Err(MeshError::MalformedPositions(self.positions.len()));
        }
        let vertex_count = self.positions.len() / 3;
        let vertex = |i: u32| -> Result<Point3> {
            let i = i as usize;
            if i >= vertex_count {
                return Err(MeshError::IndexOutOfRange {
                    index: i as u32,
                    vertex_count,
                });
            }
            let p = Point3::new(
                self.positions[3 * i],
                self.positions[3 * i + 1],
                self.positions[3 * i + 2],
            );
            Ok(world.apply_point(&p))
        };

        match &self.indices {
            Some(indices) => {
                for tri in indices.chunks_exact(3) {
                    out.push(Triangle::new(vertex(tri[0])?, vertex(tri[1])?, vertex(tri[2])?));
                }
            }
            None => {
                for first in (0..vertex_count as u32 / 3).map(|t| t * 3) {
                    out.push(Triangle::new(
                        vertex(first)?,
                        vertex(first + 1)?,
                        vertex(first + 2)?,
                    ));
                }
            }
        }

        for child in &self.children {
            child.extract_into(&world, out)?;
        }
        Ok(())
    }
}
