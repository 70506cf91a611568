use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    capture::CaptureSource,
    inference::{ModelLease, ModelSessionManager, SignClassifier},
    settings::{AppSettings, DetectionSettings},
};

use super::{
    filter::PredictionFilter,
    loop_worker::{detection_loop, AcceptedSign, DetectionLoop},
    stats::{DetectionSnapshot, DetectionStats},
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const SIGN_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Unmount,
    PermissionRevoked,
    NavigatedAway,
    /// Handing the model over to a one-shot verification.
    Verification,
}

/// Starts and tears down the continuous detection loop. Holds the model
/// lease for as long as the loop may run.
pub struct DetectionController {
    manager: ModelSessionManager,
    model_path: PathBuf,
    classifier: SignClassifier,
    settings: DetectionSettings,
    stats: DetectionStats,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    lease: Option<ModelLease>,
}

impl DetectionController {
    pub fn new(manager: ModelSessionManager, settings: &AppSettings) -> Self {
        Self {
            manager,
            model_path: settings.model_path.clone(),
            classifier: SignClassifier::from_settings(settings),
            settings: settings.detection.clone(),
            stats: DetectionStats::default(),
            handle: None,
            cancel_token: None,
            lease: None,
        }
    }

    /// Loads the model and spawns the loop. A load failure comes back as a
    /// [`crate::inference::ModelLoadError`] inside the `anyhow` chain; it is
    /// fatal for detection only.
    pub fn start(
        &mut self,
        capture: Arc<dyn CaptureSource>,
    ) -> Result<mpsc::Receiver<AcceptedSign>> {
        if self.handle.is_some() {
            bail!("detection already active");
        }
        if !capture.is_ready() {
            bail!("capture source not ready");
        }

        let lease = self
            .manager
            .load(&self.model_path)
            .context("detection model unavailable")?;
        let model = lease
            .handle()
            .ok_or_else(|| anyhow!("model lease has no handle"))?;

        let (signs_tx, signs_rx) = mpsc::channel(SIGN_CHANNEL_CAPACITY);
        let cancel_token = CancellationToken::new();
        self.stats = DetectionStats::default();

        let ctx = DetectionLoop {
            capture,
            classifier: self.classifier.clone(),
            model,
            filter: PredictionFilter::from_settings(&self.settings),
            signs_tx,
            stats: self.stats.clone(),
            interval: self.settings.interval(),
        };

        let handle = tokio::spawn(detection_loop(ctx, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.lease = Some(lease);
        Ok(signs_rx)
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn stats(&self) -> DetectionSnapshot {
        self.stats.snapshot()
    }

    /// Cancels the loop, waits for it, then releases the model exactly once.
    /// Safe to call when not running.
    pub async fn stop(&mut self, reason: StopReason) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        let joined = if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("detection loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        };

        // Release waits on any forward pass still holding the handle, so it
        // runs on the blocking pool.
        if let Some(lease) = self.lease.take() {
            tokio::task::spawn_blocking(move || lease.release())
                .await
                .context("model release task failed")?;
            log_info!("detection stopped ({:?}), {:?}", reason, self.stats.snapshot());
        }

        joined
    }
}

impl Drop for DetectionController {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        let Some(lease) = self.lease.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(move || lease.release());
            }
            Err(_) => {
                log_warn!("detection controller dropped outside a runtime, releasing inline");
                lease.release();
            }
        }
    }
}
