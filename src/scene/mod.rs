mod backend;
mod error;
mod instances;
mod marker;
mod pool;

pub use backend::{BufferHandle, HeadlessBackend, MeshHandle, RenderBackend};
pub use error::SceneError;
pub use instances::InstanceLayer;
pub use marker::{Geometry, MarkerTemplate};
pub use pool::{ObjectMetadata, RenderObject, RenderObjectPool};

#[cfg(test)]
pub(crate) use pool::tests::target;
