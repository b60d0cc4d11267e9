//! The builder service: one object turning meshes into structures.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use refract_kernel_mesh::{MeshNode, Triangle};
use refract_kernel_raytrace::{BvhBuilder, LinearBvh, SahBuilder};
use refract_kernel_voxel::{voxelize_mesh, voxelize_mesh_svo, SvoBuffer, VoxelGridBuffer};

use crate::error::{KernelError, Result};
use crate::settings::BuildSettings;
use crate::slot::StructureSlot;
use crate::structure::{AccelStructure, StructureKind};

/// Builds acceleration structures from triangle soups.
///
/// Constructed once with its settings and passed to whatever needs
/// mesh-to-buffer conversion. It holds no other state, so it is cheap to
/// clone into worker threads.
#[derive(Debug, Clone, Default)]
pub struct AccelBuilder {
    settings: BuildSettings,
}

impl AccelBuilder {
    /// Create a builder, rejecting invalid settings.
    pub fn new(settings: BuildSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// Active settings.
    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// SAH BVH over the triangles.
    pub fn build_bvh(&self, triangles: &[Triangle]) -> Result<LinearBvh> {
        Ok(SahBuilder::new(self.settings.bvh).build(triangles)?)
    }

    /// Dense voxel grid fitted to the mesh bounds.
    pub fn build_voxel_grid(&self, triangles: &[Triangle]) -> Result<VoxelGridBuffer> {
        let grid = voxelize_mesh(triangles, &self.settings.grid)?;
        Ok(VoxelGridBuffer::from_grid(&grid))
    }

    /// Linearized sparse voxel octree.
    pub fn build_svo(&self, triangles: &[Triangle]) -> Result<SvoBuffer> {
        let svo = voxelize_mesh_svo(triangles, &self.settings.svo)?;
        Ok(svo.to_buffer()?)
    }

    /// Build a structure of the given kind.
    pub fn build(&self, kind: StructureKind, triangles: &[Triangle]) -> Result<AccelStructure> {
        log::debug!("building {kind} over {} triangles", triangles.len());
        Ok(match kind {
            StructureKind::Bvh => self.build_bvh(triangles)?.into(),
            StructureKind::Grid => self.build_voxel_grid(triangles)?.into(),
            StructureKind::Svo => self.build_svo(triangles)?.into(),
        })
    }

    /// Extract the triangles of a mesh hierarchy and build from them.
    pub fn build_mesh(&self, kind: StructureKind, mesh: &MeshNode) -> Result<AccelStructure> {
        let triangles = mesh.extract_triangles()?;
        self.build(kind, &triangles)
    }

    /// Build on a worker thread and publish the result into `slot`.
    ///
    /// The slot keeps serving its previous structure until the build
    /// finishes; a failed build leaves it untouched.
    pub fn spawn_build(
        &self,
        kind: StructureKind,
        triangles: Vec<Triangle>,
        slot: Arc<StructureSlot>,
    ) -> BuildHandle {
        let builder = self.clone();
        let handle = thread::spawn(move || -> Result<()> {
            let structure = builder.build(kind, &triangles)?;
            slot.publish(structure);
            Ok(())
        });
        BuildHandle { handle }
    }
}

/// A background build started by [`AccelBuilder::spawn_build`].
#[derive(Debug)]
pub struct BuildHandle {
    handle: JoinHandle<Result<()>>,
}

impl BuildHandle {
    /// Whether the worker has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker and return its build result.
    pub fn join(self) -> Result<()> {
        self.handle.join().map_err(|_| KernelError::WorkerPanicked)?
    }
}
