use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SceneError {
    #[error("render backend already disposed")]
    Disposed,
    #[error("render backend allocation failed: {0}")]
    Allocation(String),
}
