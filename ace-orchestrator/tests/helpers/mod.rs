//! Shared test helpers: a scripted in-memory backend
//!
//! `FakeBackend` implements every collaborator trait. Tests flip failure
//! switches and seed history / inventory through `state`.

#![allow(dead_code)]

use ace_common::api::{
    BackendConfig, GenerationCreate, GenerationRecord, GenerationUpdate, LlmTask, LlmTaskRequest,
    ModelInventoryEntry,
};
use ace_common::config::PollingConfig;
use ace_common::events::{EventBus, StudioEvent};
use ace_orchestrator::config::ProviderSettings;
use ace_orchestrator::error::BackendError;
use ace_orchestrator::types::{
    AssetCreator, BackendConfigSource, CoverRegenerator, HistorySource, LibraryEditor,
    LlmTaskExecutor, ModelInventorySource,
};
use ace_orchestrator::Orchestrator;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast::Receiver;
use tokio::sync::Notify;

pub const EXPANDED_PREFIX: &str = "Expanded: ";
pub const GENERATED_LYRICS: &str = "[Verse]\nRain on the window";
pub const GENERATED_TITLE: &str = "\"Neon Dreams!!\"";
pub const GENERATED_IMAGE_PROMPT: &str = "A neon skyline at night";

/// Scripted backend state
#[derive(Default)]
pub struct FakeState {
    pub llm_calls: Vec<LlmTaskRequest>,
    pub failing_tasks: HashSet<LlmTask>,
    pub empty_tasks: HashSet<LlmTask>,
    pub created: Vec<GenerationCreate>,
    pub fail_create: bool,
    pub history: Vec<GenerationRecord>,
    pub fail_history: bool,
    pub history_calls: usize,
    pub inventory: Vec<ModelInventoryEntry>,
    pub fail_inventory: bool,
    pub cover_calls: Vec<String>,
    pub fail_cover: bool,
    pub deleted: Vec<String>,
    pub updates: Vec<(String, GenerationUpdate)>,
    pub audio: HashMap<String, Vec<u8>>,
    pub config: BackendConfig,
    next_id: u32,
}

/// Two-sided latch used to hold asset creation mid-flight
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
    create_gate: Option<Gate>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asset creation waits on `gate().release` after signalling `gate().entered`
    pub fn gated() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            create_gate: Some(Gate::default()),
        }
    }

    pub fn gate(&self) -> &Gate {
        self.create_gate.as_ref().expect("backend built with FakeBackend::gated")
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn fail_task(&self, task: LlmTask) {
        self.state().failing_tasks.insert(task);
    }

    /// Insert or replace a history record
    pub fn upsert(&self, record: GenerationRecord) {
        let mut state = self.state();
        match state.history.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => state.history.push(record),
        }
    }

    pub fn llm_tasks(&self) -> Vec<LlmTask> {
        self.state().llm_calls.iter().map(|c| c.task).collect()
    }

    pub fn last_payload(&self) -> Option<GenerationCreate> {
        self.state().created.last().cloned()
    }
}

pub fn record(id: &str, status: &str) -> GenerationRecord {
    serde_json::from_value(json!({
        "id": id,
        "title": "Neon Dreams",
        "status": status,
        "prompt": "synthwave at night",
        "lyrics": "[Verse]",
        "model_variant": "turbo",
        "metadata": {"weirdness": 55, "style_influence": 20}
    }))
    .unwrap()
}

pub fn record_with_cover(id: &str, status: &str, cover: Option<&str>) -> GenerationRecord {
    let mut r = record(id, status);
    r.cover_image_url = cover.map(str::to_string);
    r
}

pub fn inventory_entry(id: &str, status: &str) -> ModelInventoryEntry {
    ModelInventoryEntry {
        id: id.to_string(),
        status: status.to_string(),
        display_name: None,
    }
}

#[async_trait::async_trait]
impl LlmTaskExecutor for FakeBackend {
    async fn run_llm_task(&self, request: LlmTaskRequest) -> Result<String, BackendError> {
        let mut state = self.state();
        state.llm_calls.push(request.clone());

        if state.failing_tasks.contains(&request.task) {
            return Err(BackendError::Api(500, format!("{} task failed", request.task)));
        }
        if state.empty_tasks.contains(&request.task) {
            return Ok(String::new());
        }

        Ok(match request.task {
            LlmTask::Prompt => format!("{}{}", EXPANDED_PREFIX, request.seed_prompt),
            LlmTask::Lyrics => GENERATED_LYRICS.to_string(),
            LlmTask::Title => GENERATED_TITLE.to_string(),
            LlmTask::Image => GENERATED_IMAGE_PROMPT.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl AssetCreator for FakeBackend {
    async fn create_asset(&self, payload: &GenerationCreate) -> Result<GenerationRecord, BackendError> {
        if let Some(gate) = &self.create_gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let mut state = self.state();
        state.created.push(payload.clone());
        if state.fail_create {
            return Err(BackendError::Api(422, "invalid payload".into()));
        }

        state.next_id += 1;
        let mut created = record(&format!("gen-{}", state.next_id), "queued");
        created.title = payload.title.clone();
        Ok(created)
    }
}

#[async_trait::async_trait]
impl HistorySource for FakeBackend {
    async fn list_history(&self) -> Result<Vec<GenerationRecord>, BackendError> {
        let mut state = self.state();
        state.history_calls += 1;
        if state.fail_history {
            return Err(BackendError::Network("connection refused".into()));
        }
        Ok(state.history.clone())
    }
}

#[async_trait::async_trait]
impl ModelInventorySource for FakeBackend {
    async fn list_model_inventory(&self) -> Result<Vec<ModelInventoryEntry>, BackendError> {
        let state = self.state();
        if state.fail_inventory {
            return Err(BackendError::Network("connection refused".into()));
        }
        Ok(state.inventory.clone())
    }
}

#[async_trait::async_trait]
impl CoverRegenerator for FakeBackend {
    async fn regenerate_cover(&self, id: &str) -> Result<Option<GenerationRecord>, BackendError> {
        let mut state = self.state();
        state.cover_calls.push(id.to_string());
        if state.fail_cover {
            return Err(BackendError::Api(400, "Image generation provider not configured".into()));
        }
        Ok(None)
    }
}

#[async_trait::async_trait]
impl LibraryEditor for FakeBackend {
    async fn delete_generation(&self, id: &str) -> Result<(), BackendError> {
        let mut state = self.state();
        if !state.history.iter().any(|r| r.id == id) {
            return Err(BackendError::NotFound(id.to_string()));
        }
        state.history.retain(|r| r.id != id);
        state.deleted.push(id.to_string());
        Ok(())
    }

    async fn update_generation(
        &self,
        id: &str,
        update: &GenerationUpdate,
    ) -> Result<GenerationRecord, BackendError> {
        let mut state = self.state();
        state.updates.push((id.to_string(), update.clone()));
        let existing = state
            .history
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        if let Some(title) = &update.title {
            existing.title = Some(title.clone());
        }
        if let Some(prompt) = &update.prompt {
            existing.prompt = Some(prompt.clone());
        }
        if let Some(lyrics) = &update.lyrics {
            existing.lyrics = Some(lyrics.clone());
        }
        Ok(existing.clone())
    }

    async fn fetch_audio(&self, audio_url: &str) -> Result<Vec<u8>, BackendError> {
        self.state()
            .audio
            .get(audio_url)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(audio_url.to_string()))
    }
}

#[async_trait::async_trait]
impl BackendConfigSource for FakeBackend {
    async fn fetch_config(&self) -> Result<BackendConfig, BackendError> {
        Ok(self.state().config.clone())
    }
}

/// Orchestrator over `backend` with the given image provider
pub fn orchestrator_with(backend: Arc<FakeBackend>, image_provider: &str) -> Orchestrator {
    let settings = ProviderSettings {
        image_generation_provider: image_provider.to_string(),
        ..Default::default()
    };
    Orchestrator::new(backend, settings, PollingConfig::default(), EventBus::new(256))
}

pub fn orchestrator(backend: Arc<FakeBackend>) -> Orchestrator {
    orchestrator_with(backend, "none")
}

/// Every event currently buffered on `rx`
pub fn drain(rx: &mut Receiver<StudioEvent>) -> Vec<StudioEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
