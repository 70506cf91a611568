pub mod capture;
pub mod detection;
pub mod inference;
pub mod level;
pub mod models;
pub mod remote;
pub mod settings;
pub mod task;
mod utils;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use anyhow::Result;

pub use capture::{CaptureSource, Frame, StillFileSource};
pub use detection::{AcceptedSign, DetectionController, StopReason};
pub use inference::{InferenceRuntime, ModelLoadError, ModelSessionManager};
pub use level::{HeartsCache, LevelController, LevelEvent, Notice};
pub use remote::{HttpRemoteSync, RemoteError, RemoteSync};
pub use settings::{AppSettings, SettingsStore};
pub use task::{OneShotVerifier, SignVerifier, TaskAnswer};

/// Installs the `env_logger` backend. Reads `RUST_LOG`; `SIGNLINGO_DEBUG`
/// raises the default to debug. Safe to call more than once.
pub fn init_logging() {
    let level = if settings::debug_mode() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

/// Long-lived services a shell keeps for the app's lifetime and hands to
/// each screen that needs them.
#[derive(Clone)]
pub struct AppServices {
    pub settings: AppSettings,
    pub models: ModelSessionManager,
    pub remote: Arc<dyn RemoteSync>,
    pub hearts: HeartsCache,
}

impl AppServices {
    /// Wires the HTTP backend and the given inference runtime from settings.
    pub fn new(settings: AppSettings, runtime: Arc<dyn InferenceRuntime>) -> Result<Self> {
        log::info!(
            "SignLingo core starting (language {}, model {})",
            settings.language,
            settings.model_path.display()
        );
        let remote = HttpRemoteSync::new(&settings.remote)?;
        Ok(Self {
            models: ModelSessionManager::new(runtime),
            remote: Arc::new(remote),
            hearts: HeartsCache::new(),
            settings,
        })
    }

    pub fn detection(&self) -> DetectionController {
        DetectionController::new(self.models.clone(), &self.settings)
    }

    pub fn verifier(&self) -> OneShotVerifier {
        OneShotVerifier::new(self.models.clone(), &self.settings)
    }
}
