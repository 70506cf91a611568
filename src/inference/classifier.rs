use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{capture::Frame, models::Prediction, settings::AppSettings};

use super::{
    preprocess::{decode_top1, frame_to_tensor},
    session::ModelHandle,
};

/// Frame in, top-1 prediction out. Decoding, resizing and the forward pass
/// run on the blocking pool.
#[derive(Debug, Clone)]
pub struct SignClassifier {
    input_size: [u32; 2],
    apply_softmax: bool,
}

impl SignClassifier {
    pub fn new(input_size: [u32; 2], apply_softmax: bool) -> Self {
        Self {
            input_size,
            apply_softmax,
        }
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(settings.input_size, settings.apply_softmax)
    }

    pub async fn classify(&self, model: Arc<ModelHandle>, frame: &Frame) -> Result<Option<Prediction>> {
        let bytes = Arc::clone(&frame.bytes);
        let input_size = self.input_size;
        let apply_softmax = self.apply_softmax;

        tokio::task::spawn_blocking(move || -> Result<Option<Prediction>> {
            let tensor = frame_to_tensor(&bytes, input_size)?;
            let scores = model.run(&tensor).context("forward pass failed")?;
            Ok(decode_top1(&scores, apply_softmax))
        })
        .await
        .context("inference worker join failed")?
    }
}

impl Default for SignClassifier {
    fn default() -> Self {
        Self::from_settings(&AppSettings::default())
    }
}
