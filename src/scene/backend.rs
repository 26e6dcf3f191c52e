use nalgebra::{Matrix4, Point3};
use std::collections::HashMap;

use super::error::SceneError;
use super::marker::Geometry;
use crate::transform::PerspectiveCamera;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(u64);

/// GPU side of the scene. Every handle a backend hands out must be returned
/// through the matching release call; `dispose` drops whatever is left.
pub trait RenderBackend: Send {
    fn allocate_mesh(&mut self, geometry: &Geometry) -> Result<MeshHandle, SceneError>;
    fn set_transform(&mut self, mesh: MeshHandle, world: &Matrix4<f64>);
    fn release_mesh(&mut self, mesh: MeshHandle);

    fn upload_instances(&mut self, positions: &[Point3<f32>]) -> Result<BufferHandle, SceneError>;
    /// Transform shared by every instance in the buffer.
    fn set_instance_transform(&mut self, buffer: BufferHandle, world: &Matrix4<f64>);
    fn release_instances(&mut self, buffer: BufferHandle);

    fn draw(&mut self, camera: &PerspectiveCamera);
    fn dispose(&mut self);
}

/// Backend that keeps only bookkeeping. Used by the headless runner and in
/// tests to check that resources are balanced.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_id: u64,
    meshes: HashMap<MeshHandle, Matrix4<f64>>,
    buffers: HashMap<BufferHandle, (usize, Matrix4<f64>)>,
    frames: u64,
    disposed: bool,
    mesh_limit: Option<usize>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse mesh allocations beyond `limit` live meshes, like a device that
    /// has run out of memory.
    pub fn with_mesh_limit(limit: usize) -> Self {
        Self {
            mesh_limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn live_meshes(&self) -> usize {
        self.meshes.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Instance count of every live buffer.
    pub fn buffer_sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<_> = self.buffers.values().map(|(n, _)| *n).collect();
        sizes.sort_unstable();
        sizes
    }

    pub fn transform(&self, mesh: MeshHandle) -> Option<&Matrix4<f64>> {
        self.meshes.get(&mesh)
    }

    pub fn instance_transform(&self, buffer: BufferHandle) -> Option<&Matrix4<f64>> {
        self.buffers.get(&buffer).map(|(_, world)| world)
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn next_id(&mut self) -> Result<u64, SceneError> {
        if self.disposed {
            return Err(SceneError::Disposed);
        }
        self.next_id += 1;
        Ok(self.next_id)
    }
}

impl RenderBackend for HeadlessBackend {
    fn allocate_mesh(&mut self, _geometry: &Geometry) -> Result<MeshHandle, SceneError> {
        if let Some(limit) = self.mesh_limit {
            if self.meshes.len() >= limit {
                return Err(SceneError::Allocation(format!("{} meshes live", limit)));
            }
        }
        let handle = MeshHandle(self.next_id()?);
        self.meshes.insert(handle, Matrix4::identity());
        Ok(handle)
    }

    fn set_transform(&mut self, mesh: MeshHandle, world: &Matrix4<f64>) {
        match self.meshes.get_mut(&mesh) {
            Some(m) => *m = *world,
            None => log::warn!("Transform for unknown mesh {:?}", mesh),
        }
    }

    fn release_mesh(&mut self, mesh: MeshHandle) {
        if self.meshes.remove(&mesh).is_none() {
            log::warn!("Release of unknown mesh {:?}", mesh);
        }
    }

    fn upload_instances(&mut self, positions: &[Point3<f32>]) -> Result<BufferHandle, SceneError> {
        let handle = BufferHandle(self.next_id()?);
        self.buffers
            .insert(handle, (positions.len(), Matrix4::identity()));
        Ok(handle)
    }

    fn set_instance_transform(&mut self, buffer: BufferHandle, world: &Matrix4<f64>) {
        match self.buffers.get_mut(&buffer) {
            Some((_, m)) => *m = *world,
            None => log::warn!("Transform for unknown instance buffer {:?}", buffer),
        }
    }

    fn release_instances(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_none() {
            log::warn!("Release of unknown instance buffer {:?}", buffer);
        }
    }

    fn draw(&mut self, _camera: &PerspectiveCamera) {
        if !self.disposed {
            self.frames += 1;
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if !self.meshes.is_empty() || !self.buffers.is_empty() {
            log::warn!(
                "Disposing backend with {} meshes and {} instance buffers still held",
                self.meshes.len(),
                self.buffers.len()
            );
        }
        log::debug!("Headless backend disposed after {} frames", self.frames);
        self.meshes.clear();
        self.buffers.clear();
        self.disposed = true;
    }
}
