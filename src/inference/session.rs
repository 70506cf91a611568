use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, RwLock},
};

use anyhow::{bail, Result};
use uuid::Uuid;

use super::runtime::{InferenceRuntime, LoadedModel, ModelLoadError, Tensor};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// A loaded model. Owned by whichever caller holds its [`ModelLease`].
pub struct ModelHandle {
    id: Uuid,
    artifact: PathBuf,
    model: Arc<dyn LoadedModel>,
    /// `true` once released. Runs hold the read side so release waits for
    /// an in-flight forward pass instead of freeing under it.
    released: RwLock<bool>,
}

impl ModelHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    pub fn is_released(&self) -> bool {
        *self.released.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn run(&self, input: &Tensor) -> Result<Vec<f32>> {
        let released = self.released.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *released {
            bail!("model handle {} already released", self.id);
        }
        self.model.run(input)
    }

    fn release_once(&self) -> bool {
        let mut released = self
            .released
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *released {
            return false;
        }
        *released = true;
        self.model.release();
        true
    }
}

/// Owns the lifecycle of the single model a detection session may hold.
#[derive(Clone)]
pub struct ModelSessionManager {
    runtime: Arc<dyn InferenceRuntime>,
    active: Arc<Mutex<Option<Uuid>>>,
}

impl ModelSessionManager {
    pub fn new(runtime: Arc<dyn InferenceRuntime>) -> Self {
        Self {
            runtime,
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Checks that the bundled artifact exists locally before the runtime
    /// sees it.
    pub fn resolve_artifact(path: &Path) -> Result<PathBuf, ModelLoadError> {
        if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(ModelLoadError::ArtifactMissing(path.display().to_string()))
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock_active().is_some()
    }

    /// Loads the artifact and hands back a lease whose drop releases it.
    /// Loading while another handle is live is a caller error.
    pub fn load(&self, path: &Path) -> Result<ModelLease, ModelLoadError> {
        let mut active = self.lock_active();
        if active.is_some() {
            return Err(ModelLoadError::AlreadyActive);
        }

        let artifact = Self::resolve_artifact(path)?;
        let model = self.runtime.load(&artifact)?;
        let handle = Arc::new(ModelHandle {
            id: Uuid::new_v4(),
            artifact,
            model,
            released: RwLock::new(false),
        });
        *active = Some(handle.id);

        log_info!(
            "model {} loaded from {}",
            handle.id,
            handle.artifact.display()
        );

        Ok(ModelLease {
            manager: self.clone(),
            handle: Some(handle),
        })
    }

    /// Idempotent; `None` and already released handles are ignored.
    pub fn release(&self, handle: Option<&ModelHandle>) {
        let Some(handle) = handle else {
            return;
        };

        if handle.release_once() {
            log_info!("model {} released", handle.id);
        }

        let mut active = self.lock_active();
        if *active == Some(handle.id) {
            *active = None;
        } else if active.is_some() {
            log_warn!(
                "released model {} is not the active handle {:?}",
                handle.id,
                *active
            );
        }
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<Uuid>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Scoped ownership of a [`ModelHandle`]: released on drop, on every exit
/// path.
pub struct ModelLease {
    manager: ModelSessionManager,
    handle: Option<Arc<ModelHandle>>,
}

impl ModelLease {
    /// Shared reference for `spawn_blocking` work. The handle refuses to run
    /// once the lease is gone.
    pub fn handle(&self) -> Option<Arc<ModelHandle>> {
        self.handle.clone()
    }

    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.manager.release(Some(handle.as_ref()));
        }
    }
}

impl Drop for ModelLease {
    fn drop(&mut self) {
        self.release_inner();
    }
}
