pub mod http;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ApiTask, HeartsState};

pub use http::HttpRemoteSync;
pub use types::{LevelCompletionRequest, LevelCompletionResponse};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected response body: {0}")]
    Decode(String),
    /// Consume was refused because the balance is already empty.
    #[error("no hearts left")]
    NoHearts,
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// The backend the level flow talks to. Every call is a suspension point;
/// nothing here retries.
#[async_trait]
pub trait RemoteSync: Send + Sync {
    async fn fetch_tasks(&self, level_id: u32, language: &str) -> RemoteResult<Vec<ApiTask>>;

    async fn get_hearts(&self) -> RemoteResult<HeartsState>;

    /// Spends one heart and returns the post-consumption balance.
    async fn consume_heart(&self) -> RemoteResult<HeartsState>;

    async fn complete_level(
        &self,
        request: &LevelCompletionRequest,
    ) -> RemoteResult<LevelCompletionResponse>;
}
