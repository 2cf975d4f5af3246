//! Collaborator traits consumed by the orchestration core
//!
//! The core never talks HTTP directly. Each suspension point (LLM task,
//! asset creation, history poll, inventory poll, cover regeneration) goes
//! through one of these traits, so the production [`BackendClient`] and the
//! scripted test backends are interchangeable.
//!
//! [`BackendClient`]: crate::services::BackendClient

use ace_common::api::{
    BackendConfig, GenerationCreate, GenerationRecord, GenerationUpdate, LlmTaskRequest,
    ModelInventoryEntry,
};

use crate::error::BackendError;

/// Runs prompt / lyrics / title / image text tasks
#[async_trait::async_trait]
pub trait LlmTaskExecutor: Send + Sync {
    /// Returns the generated text
    async fn run_llm_task(&self, request: LlmTaskRequest) -> Result<String, BackendError>;
}

/// Creates the final asset; the returned record carries the server id
#[async_trait::async_trait]
pub trait AssetCreator: Send + Sync {
    async fn create_asset(
        &self,
        payload: &GenerationCreate,
    ) -> Result<GenerationRecord, BackendError>;
}

/// Read-only authoritative history (polled)
#[async_trait::async_trait]
pub trait HistorySource: Send + Sync {
    async fn list_history(&self) -> Result<Vec<GenerationRecord>, BackendError>;
}

/// Read-only checkpoint inventory (polled)
#[async_trait::async_trait]
pub trait ModelInventorySource: Send + Sync {
    async fn list_model_inventory(&self) -> Result<Vec<ModelInventoryEntry>, BackendError>;
}

/// Triggers cover-art regeneration for a record
#[async_trait::async_trait]
pub trait CoverRegenerator: Send + Sync {
    /// Some backends answer with the updated record, others with nothing
    async fn regenerate_cover(&self, id: &str) -> Result<Option<GenerationRecord>, BackendError>;
}

/// Library maintenance calls outside the generation pipeline
#[async_trait::async_trait]
pub trait LibraryEditor: Send + Sync {
    async fn delete_generation(&self, id: &str) -> Result<(), BackendError>;

    async fn update_generation(
        &self,
        id: &str,
        update: &GenerationUpdate,
    ) -> Result<GenerationRecord, BackendError>;

    /// Download the bytes behind a record's audio reference
    async fn fetch_audio(&self, audio_url: &str) -> Result<Vec<u8>, BackendError>;
}

/// Backend runtime configuration (image provider, preferred variant)
#[async_trait::async_trait]
pub trait BackendConfigSource: Send + Sync {
    async fn fetch_config(&self) -> Result<BackendConfig, BackendError>;
}

/// Everything the orchestrator needs from one backend
pub trait StudioBackend:
    LlmTaskExecutor
    + AssetCreator
    + HistorySource
    + ModelInventorySource
    + CoverRegenerator
    + LibraryEditor
    + BackendConfigSource
    + 'static
{
}

impl<T> StudioBackend for T where
    T: LlmTaskExecutor
        + AssetCreator
        + HistorySource
        + ModelInventorySource
        + CoverRegenerator
        + LibraryEditor
        + BackendConfigSource
        + 'static
{
}
