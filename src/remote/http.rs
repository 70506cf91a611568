use std::{sync::RwLock, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    models::{ApiTask, HeartsEnvelope, HeartsState, TasksResponse},
    settings::RemoteSettings,
};

use super::{
    types::{ErrorBody, LevelCompletionRequest, LevelCompletionResponse},
    RemoteError, RemoteResult, RemoteSync,
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// reqwest-backed [`RemoteSync`] speaking the learning/users JSON API.
pub struct HttpRemoteSync {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpRemoteSync {
    pub fn new(settings: &RemoteSettings) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.set_token(Some(token.into()));
        self
    }

    /// Replaces the bearer token sent with every request.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = token;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> RemoteResult<T> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let response = check_status(response).await?;

        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

async fn check_status(response: Response) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    Err(RemoteError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RemoteSync for HttpRemoteSync {
    async fn fetch_tasks(&self, level_id: u32, language: &str) -> RemoteResult<Vec<ApiTask>> {
        let request = self
            .client
            .get(self.url("/tasks"))
            .query(&[("level", level_id.to_string()), ("language", language.to_string())]);

        let body: TasksResponse = self.send(request).await?;
        log_info!("fetched {} tasks for level {}", body.tasks.len(), level_id);
        Ok(body.tasks)
    }

    async fn get_hearts(&self) -> RemoteResult<HeartsState> {
        let envelope: HeartsEnvelope = self.send(self.client.get(self.url("/hearts"))).await?;
        Ok(envelope.into())
    }

    async fn consume_heart(&self) -> RemoteResult<HeartsState> {
        let request = self.client.patch(self.url("/hearts/consume"));
        match self.send::<HeartsEnvelope>(request).await {
            Ok(envelope) => Ok(envelope.into()),
            Err(RemoteError::Status { status, message })
                if status == StatusCode::BAD_REQUEST.as_u16()
                    && message.to_lowercase().contains("no hearts") =>
            {
                log_warn!("heart consume refused: {}", message);
                Err(RemoteError::NoHearts)
            }
            // The backend reads a zero balance as a missing user record.
            Err(RemoteError::Status { status, message })
                if status == StatusCode::NOT_FOUND.as_u16() =>
            {
                log_warn!("heart consume found no balance: {}", message);
                Err(RemoteError::NoHearts)
            }
            Err(err) => Err(err),
        }
    }

    async fn complete_level(
        &self,
        request: &LevelCompletionRequest,
    ) -> RemoteResult<LevelCompletionResponse> {
        let builder = self.client.post(self.url("/levels/complete")).json(request);
        self.send(builder).await
    }
}
