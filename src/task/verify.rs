use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use crate::{
    capture::Frame,
    inference::{ModelSessionManager, SignClassifier},
    models::Prediction,
    settings::AppSettings,
};

const ENABLE_LOGS: bool = true;

use crate::log_info;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub prediction: Option<Prediction>,
    pub is_correct: bool,
}

/// Judges a single captured still against the expected sign.
#[async_trait]
pub trait SignVerifier: Send + Sync {
    fn is_ready(&self) -> bool;

    async fn verify(&self, frame: &Frame, target: &str) -> Result<Verification>;
}

/// Loads the model for exactly one forward pass and releases it before
/// returning, on success or failure.
pub struct OneShotVerifier {
    manager: ModelSessionManager,
    model_path: PathBuf,
    classifier: SignClassifier,
    threshold: f32,
}

impl OneShotVerifier {
    pub fn new(manager: ModelSessionManager, settings: &AppSettings) -> Self {
        Self {
            manager,
            model_path: settings.model_path.clone(),
            classifier: SignClassifier::from_settings(settings),
            threshold: settings.verify_threshold,
        }
    }
}

#[async_trait]
impl SignVerifier for OneShotVerifier {
    /// Not ready while the live detection loop still holds the model.
    fn is_ready(&self) -> bool {
        ModelSessionManager::resolve_artifact(&self.model_path).is_ok() && !self.manager.is_active()
    }

    async fn verify(&self, frame: &Frame, target: &str) -> Result<Verification> {
        let lease = self
            .manager
            .load(&self.model_path)
            .context("verification model unavailable")?;
        let model = lease
            .handle()
            .ok_or_else(|| anyhow!("model lease has no handle"))?;

        let prediction = self.classifier.classify(model, frame).await;
        lease.release();
        let prediction = prediction.context("one-shot inference failed")?;

        let is_correct = prediction
            .as_ref()
            .map(|p| p.matches(target) && p.probability > self.threshold)
            .unwrap_or(false);

        log_info!(
            "verified {:?} against {}: {}",
            prediction.as_ref().map(|p| (&p.label, p.probability)),
            target,
            if is_correct { "correct" } else { "incorrect" }
        );

        Ok(Verification {
            prediction,
            is_correct,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{scores_for, solid_png, FakeRuntime};

    fn verifier(runtime: std::sync::Arc<FakeRuntime>, artifact: &std::path::Path) -> (OneShotVerifier, ModelSessionManager) {
        let manager = ModelSessionManager::new(runtime);
        let settings = AppSettings {
            model_path: artifact.to_path_buf(),
            input_size: [8, 8],
            apply_softmax: false,
            ..AppSettings::default()
        };
        (OneShotVerifier::new(manager.clone(), &settings), manager)
    }

    fn frame() -> Frame {
        Frame::new("mem://verify.png", solid_png(16, 16, [200, 180, 160]))
    }

    #[tokio::test]
    async fn matching_label_above_half_is_correct() {
        let artifact = tempfile::NamedTempFile::new().unwrap();
        let runtime = FakeRuntime::new(scores_for("L", 0.62));
        let (verifier, manager) = verifier(runtime.clone(), artifact.path());

        assert!(verifier.is_ready());
        let verdict = verifier.verify(&frame(), "l").await.unwrap();
        assert!(verdict.is_correct);
        assert_eq!(verdict.prediction.unwrap().label, "L");
        assert_eq!(runtime.loads(), 1);
        assert_eq!(runtime.releases(), 1);
        assert!(!manager.is_active());
    }

    #[tokio::test]
    async fn low_confidence_or_wrong_label_is_incorrect() {
        let artifact = tempfile::NamedTempFile::new().unwrap();
        let runtime = FakeRuntime::new(scores_for("L", 0.5));
        let (verifier, _) = verifier(runtime.clone(), artifact.path());
        assert!(!verifier.verify(&frame(), "L").await.unwrap().is_correct);

        runtime.set_scores(scores_for("K", 0.95));
        assert!(!verifier.verify(&frame(), "L").await.unwrap().is_correct);
        assert_eq!(runtime.releases(), 2);
    }

    #[tokio::test]
    async fn not_ready_while_model_is_held_elsewhere() {
        let artifact = tempfile::NamedTempFile::new().unwrap();
        let runtime = FakeRuntime::new(scores_for("A", 0.9));
        let (verifier, manager) = verifier(runtime, artifact.path());

        let live = manager.load(artifact.path()).unwrap();
        assert!(!verifier.is_ready());
        assert!(verifier.verify(&frame(), "A").await.is_err());
        live.release();
        assert!(verifier.is_ready());
    }

    #[tokio::test]
    async fn undecodable_frame_still_releases_model() {
        let artifact = tempfile::NamedTempFile::new().unwrap();
        let runtime = FakeRuntime::new(scores_for("A", 0.9));
        let (verifier, manager) = verifier(runtime.clone(), artifact.path());

        let garbage = Frame::new("mem://bad", vec![0, 1, 2, 3]);
        assert!(verifier.verify(&garbage, "A").await.is_err());
        assert_eq!(runtime.releases(), 1);
        assert!(!manager.is_active());
    }
}
