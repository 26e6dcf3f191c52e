use nalgebra::{Matrix4, Point3};

use super::backend::{BufferHandle, RenderBackend};
use super::error::SceneError;
use crate::propagation::TickPayload;
use crate::transform;

/// Globe markers: one merged instance buffer holding every target's
/// Earth-centred position. Replaced wholesale on each tick.
#[derive(Debug)]
pub struct InstanceLayer {
    scale: f64,
    world: Matrix4<f64>,
    buffer: Option<BufferHandle>,
    count: usize,
}

impl InstanceLayer {
    pub fn new(scale: f64) -> Self {
        Self {
            scale,
            world: Matrix4::identity(),
            buffer: None,
            count: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn buffer(&self) -> Option<BufferHandle> {
        self.buffer
    }

    /// Frame the instances live in. Kept across buffer replacements.
    pub fn set_transform<B: RenderBackend + ?Sized>(
        &mut self,
        world: Matrix4<f64>,
        backend: &mut B,
    ) {
        self.world = world;
        if let Some(buffer) = self.buffer {
            backend.set_instance_transform(buffer, &self.world);
        }
    }

    /// Targets that failed to propagate carry no position and are skipped. A
    /// tick with nothing to show empties the layer.
    pub fn update<B: RenderBackend + ?Sized>(
        &mut self,
        payload: &TickPayload,
        backend: &mut B,
    ) -> Result<usize, SceneError> {
        let positions: Vec<Point3<f32>> = payload
            .geodetic()
            .iter()
            .map(|g| transform::geodetic_to_scene(g) * self.scale)
            .filter(|p| p.iter().all(|c| c.is_finite()))
            .map(|p| p.cast::<f32>())
            .collect();
        if positions.is_empty() {
            self.clear(backend);
            return Ok(0);
        }

        let next = backend.upload_instances(&positions)?;
        backend.set_instance_transform(next, &self.world);
        if let Some(previous) = self.buffer.replace(next) {
            backend.release_instances(previous);
        }
        self.count = positions.len();
        Ok(self.count)
    }

    pub fn clear<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        if let Some(buffer) = self.buffer.take() {
            backend.release_instances(buffer);
        }
        self.count = 0;
    }
}
