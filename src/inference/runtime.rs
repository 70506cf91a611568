use std::{path::Path, sync::Arc};

use anyhow::Result;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelLoadError {
    #[error("model artifact not found at {0}")]
    ArtifactMissing(String),
    #[error("inference runtime rejected the model: {0}")]
    Rejected(String),
    #[error("a model handle is already active for this detection session")]
    AlreadyActive,
}

/// Dense `f32` input in NCHW layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub shape: [usize; 4],
    pub data: Vec<f32>,
}

impl Tensor {
    pub fn zeros(shape: [usize; 4]) -> Self {
        Self {
            shape,
            data: vec![0.0; shape.iter().product()],
        }
    }
}

/// A model resident in the inference runtime. Calls are blocking and are
/// driven from `spawn_blocking`.
pub trait LoadedModel: Send + Sync {
    /// One forward pass; returns one score per class.
    fn run(&self, input: &Tensor) -> Result<Vec<f32>>;

    /// Frees native resources. Called exactly once by the session manager.
    fn release(&self);
}

/// The platform's inference engine, treated as an opaque capability.
pub trait InferenceRuntime: Send + Sync {
    fn load(&self, artifact: &Path) -> Result<Arc<dyn LoadedModel>, ModelLoadError>;
}
