//! ACE-Step backend REST client
//!
//! Implements every collaborator trait against the backend's `/api` routes.
//! Transport timeouts live here; the orchestration core imposes none.

use ace_common::api::{
    BackendConfig, GenerationCreate, GenerationRecord, GenerationUpdate, LlmTaskRequest,
    LlmTaskResponse, ModelInventoryEntry,
};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::BackendError;
use crate::types::{
    AssetCreator, BackendConfigSource, CoverRegenerator, HistorySource, LibraryEditor,
    LlmTaskExecutor, ModelInventorySource,
};

const USER_AGENT: &str = concat!("ace-orchestrator/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP client for one backend instance
#[derive(Clone)]
pub struct BackendClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// `base_url` is the backend origin, e.g. `http://127.0.0.1:8000`
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Absolute URLs pass through; backend-relative ones are joined to the origin
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        resource: &str,
    ) -> Result<Response, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(resource.to_string()));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), resource = %resource, body = %error_text, "Backend request rejected");
            return Err(BackendError::Api(status.as_u16(), error_text));
        }

        Ok(response)
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl LlmTaskExecutor for BackendClient {
    async fn run_llm_task(&self, request: LlmTaskRequest) -> Result<String, BackendError> {
        tracing::debug!(task = %request.task, "Running LLM task");

        let response = self
            .send(self.http_client.post(self.api_url("/llm")).json(&request), "llm")
            .await?;
        let body: LlmTaskResponse = Self::json(response).await?;

        tracing::debug!(task = %body.task, provider = %body.provider, chars = body.output.len(), "LLM task finished");
        Ok(body.output)
    }
}

#[async_trait::async_trait]
impl AssetCreator for BackendClient {
    async fn create_asset(&self, payload: &GenerationCreate) -> Result<GenerationRecord, BackendError> {
        let response = self
            .send(
                self.http_client.post(self.api_url("/generations")).json(payload),
                "generations",
            )
            .await?;
        let record: GenerationRecord = Self::json(response).await?;

        tracing::info!(id = %record.id, status = %record.status, "Generation created");
        Ok(record)
    }
}

#[async_trait::async_trait]
impl HistorySource for BackendClient {
    async fn list_history(&self) -> Result<Vec<GenerationRecord>, BackendError> {
        let response = self
            .send(self.http_client.get(self.api_url("/history")), "history")
            .await?;
        Self::json(response).await
    }
}

#[async_trait::async_trait]
impl ModelInventorySource for BackendClient {
    async fn list_model_inventory(&self) -> Result<Vec<ModelInventoryEntry>, BackendError> {
        let response = self
            .send(self.http_client.get(self.api_url("/models")), "models")
            .await?;
        Self::json(response).await
    }
}

#[async_trait::async_trait]
impl CoverRegenerator for BackendClient {
    async fn regenerate_cover(&self, id: &str) -> Result<Option<GenerationRecord>, BackendError> {
        let response = self
            .send(
                self.http_client
                    .post(self.api_url(&format!("/generations/{}/cover/regenerate", id))),
                id,
            )
            .await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        if bytes.is_empty() {
            return Ok(None);
        }

        // Older backends answer with a status object instead of the record
        match serde_json::from_slice::<Option<GenerationRecord>>(&bytes) {
            Ok(record) => Ok(record),
            Err(e) => {
                tracing::debug!(id = %id, error = %e, "Cover regeneration response is not a record");
                Ok(None)
            }
        }
    }
}

#[async_trait::async_trait]
impl LibraryEditor for BackendClient {
    async fn delete_generation(&self, id: &str) -> Result<(), BackendError> {
        self.send(
            self.http_client
                .delete(self.api_url(&format!("/generations/{}", id))),
            id,
        )
        .await?;
        Ok(())
    }

    async fn update_generation(
        &self,
        id: &str,
        update: &GenerationUpdate,
    ) -> Result<GenerationRecord, BackendError> {
        let response = self
            .send(
                self.http_client
                    .put(self.api_url(&format!("/generations/{}", id)))
                    .json(update),
                id,
            )
            .await?;
        Self::json(response).await
    }

    async fn fetch_audio(&self, audio_url: &str) -> Result<Vec<u8>, BackendError> {
        let url = self.resolve_url(audio_url);
        let response = self.send(self.http_client.get(&url), audio_url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl BackendConfigSource for BackendClient {
    async fn fetch_config(&self) -> Result<BackendConfig, BackendError> {
        let response = self
            .send(self.http_client.get(self.api_url("/config")), "config")
            .await?;
        Self::json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation_trims_slash() {
        let client = BackendClient::new("http://127.0.0.1:8000/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8000");
        assert_eq!(client.api_url("/history"), "http://127.0.0.1:8000/api/history");
    }

    #[test]
    fn test_resolve_url() {
        let client = BackendClient::new("http://host:8000").unwrap();
        assert_eq!(
            client.resolve_url("/api/generations/a1/audio"),
            "http://host:8000/api/generations/a1/audio"
        );
        assert_eq!(client.resolve_url("https://cdn/x.wav"), "https://cdn/x.wav");
        assert_eq!(client.resolve_url("media/x.wav"), "http://host:8000/media/x.wav");
    }
}
