use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One still produced by a capture source.
#[derive(Debug, Clone)]
pub struct Frame {
    pub uri: String,
    /// Encoded image (JPEG or PNG), shared between the tick and any
    /// blocking preprocessing without copying.
    pub bytes: Arc<Vec<u8>>,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(uri: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            uri: uri.into(),
            bytes: Arc::new(bytes),
            captured_at: Utc::now(),
        }
    }
}

/// Camera (or stand-in) that yields a frame on demand. Must report ready
/// before detection or a verify task will call `capture`.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    fn is_ready(&self) -> bool;

    async fn capture(&self) -> Result<Frame>;
}

/// Reads the latest still a shell wrote to disk.
pub struct StillFileSource {
    path: PathBuf,
}

impl StillFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CaptureSource for StillFileSource {
    fn is_ready(&self) -> bool {
        self.path.is_file()
    }

    async fn capture(&self) -> Result<Frame> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read still {}", self.path.display()))?;
        Ok(Frame::new(format!("file://{}", self.path.display()), bytes))
    }
}
