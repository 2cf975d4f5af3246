//! Generation orchestrator
//!
//! Explicit owner of all core state: the pending-entry store, the history
//! reconciler (and its last snapshot), the cover regeneration slot and the
//! model inventory. Presentation layers hold an `Arc<Orchestrator>`.
//!
//! # Lifecycle of one submission
//! 1. [`Orchestrator::submit`] creates the pending entry and spawns a
//!    [`StageSequencer`] run; the caller gets the temp id immediately.
//! 2. The run advances stages and finally binds the server id.
//! 3. A later [`HistoryReconciler`] tick sees the terminal record and retires
//!    the pending entry.
//!
//! Deleting a pending entry does not cancel its run. The run keeps going and
//! its results are discarded because the entry is gone.

pub mod cover_tracker;
pub mod history_reconciler;
pub mod model_inventory;
pub mod pending_store;
pub mod stage_sequencer;

pub use cover_tracker::{
    CoverRegenerationState, CoverRegenerationTracker, COVER_REGENERATION_FAILED_MESSAGE,
};
pub use history_reconciler::{
    merge_library, retire_terminal, HistoryReconciler, LibraryItem, ReconcileReport, RetiredEntry,
};
pub use model_inventory::{
    pick_default_variant, InventoryStatus, ModelInventoryPoller, VariantAvailability,
};
pub use pending_store::{PendingEntryStore, SharedPendingStore};
pub use stage_sequencer::{SequenceReport, StageSequencer, Step, StepOutcome, StepRecord};

use ace_common::api::{GenerationRecord, GenerationUpdate, LlmTask, LlmTaskRequest, ModelVariant};
use ace_common::config::PollingConfig;
use ace_common::events::{EventBus, StudioEvent};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ProviderSettings;
use crate::error::OrchestratorError;
use crate::models::{PendingEntry, Submission};
use crate::text::{sanitize_file_name, sanitize_title, truncate_title, with_lyrics_instruction, UNTITLED};
use crate::types::{LibraryEditor, LlmTaskExecutor, StudioBackend};

/// A running submission
pub struct SubmissionHandle {
    pub temp_id: String,
    pub task: JoinHandle<SequenceReport>,
}

pub struct Orchestrator {
    store: SharedPendingStore,
    sequencer: StageSequencer,
    reconciler: HistoryReconciler,
    covers: CoverRegenerationTracker,
    inventory: ModelInventoryPoller,
    llm: Arc<dyn LlmTaskExecutor>,
    library: Arc<dyn LibraryEditor>,
    event_bus: EventBus,
    settings: ProviderSettings,
    polling: PollingConfig,
}

impl Orchestrator {
    /// Wire every component to one backend
    pub fn new<B: StudioBackend>(
        backend: Arc<B>,
        settings: ProviderSettings,
        polling: PollingConfig,
        event_bus: EventBus,
    ) -> Self {
        let store = PendingEntryStore::shared();

        let sequencer = StageSequencer::new(
            backend.clone(),
            backend.clone(),
            Arc::clone(&store),
            event_bus.clone(),
            settings.clone(),
        );
        let reconciler = HistoryReconciler::new(backend.clone(), Arc::clone(&store), event_bus.clone());
        let covers = CoverRegenerationTracker::new(backend.clone(), event_bus.clone());
        let inventory =
            ModelInventoryPoller::new(backend.clone(), event_bus.clone(), settings.preferred_variant);

        Self {
            store,
            sequencer,
            reconciler,
            covers,
            inventory,
            llm: backend.clone(),
            library: backend,
            event_bus,
            settings,
            polling,
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    pub fn reconciler(&self) -> &HistoryReconciler {
        &self.reconciler
    }

    pub fn inventory(&self) -> &ModelInventoryPoller {
        &self.inventory
    }

    pub fn cover_tracker(&self) -> &CoverRegenerationTracker {
        &self.covers
    }

    /// Current pending entries (insertion order)
    pub async fn pending(&self) -> Vec<PendingEntry> {
        self.store.read().await.entries().to_vec()
    }

    pub async fn pending_entry(&self, temp_id: &str) -> Option<PendingEntry> {
        self.store.read().await.get(temp_id).cloned()
    }

    // ========================================
    // Submission
    // ========================================

    /// Create the pending entry and start its generation chain
    ///
    /// Returns as soon as the entry exists; the chain runs on its own task.
    pub async fn submit(&self, submission: Submission) -> SubmissionHandle {
        let model_variant = match submission.model_variant {
            Some(variant) => variant,
            None => self.inventory.default_variant().await,
        };

        let entry = new_pending_entry(&submission, model_variant);
        let temp_id = entry.temp_id.clone();
        let title = entry.title.clone();
        let stage_labels = entry.stage_labels.clone();

        self.store.write().await.create(entry);
        self.event_bus.emit_lossy(StudioEvent::PendingCreated {
            temp_id: temp_id.clone(),
            title,
            stage_labels,
            timestamp: Utc::now(),
        });

        let sequencer = self.sequencer.clone();
        let run_id = temp_id.clone();
        let task = tokio::spawn(async move {
            sequencer.run(&run_id, &submission, model_variant).await
        });

        SubmissionHandle { temp_id, task }
    }

    /// Submit and wait for the chain to finish (not for the record to be ready)
    pub async fn submit_and_wait(
        &self,
        submission: Submission,
    ) -> Result<SequenceReport, OrchestratorError> {
        let handle = self.submit(submission).await;
        handle.task.await.map_err(|e| {
            OrchestratorError::Io(std::io::Error::other(format!(
                "generation task aborted: {}",
                e
            )))
        })
    }

    /// Free-standing LLM assist (custom form helpers)
    ///
    /// Lyrics seeds carry the language instruction exactly once.
    pub async fn assist(&self, mut request: LlmTaskRequest) -> Result<String, OrchestratorError> {
        if request.task == LlmTask::Lyrics {
            request.seed_prompt = with_lyrics_instruction(&request.seed_prompt);
        }
        Ok(self.llm.run_llm_task(request).await?)
    }

    // ========================================
    // Library
    // ========================================

    /// Merged, de-duplicated library view
    pub async fn library(&self) -> Vec<LibraryItem> {
        self.reconciler.library().await
    }

    /// Delete a pending entry (local only) or an authoritative record
    pub async fn delete(&self, id: &str) -> Result<(), OrchestratorError> {
        let removed = self.store.write().await.remove(id);
        if let Some(entry) = removed {
            info!(temp_id = %entry.temp_id, "Pending entry removed; in-flight chain not cancelled");
            self.event_bus.emit_lossy(StudioEvent::PendingRemoved {
                temp_id: entry.temp_id,
                timestamp: Utc::now(),
            });
            return Ok(());
        }

        self.library.delete_generation(id).await?;
        self.reconciler.forget(id).await;
        info!(id = %id, "Generation deleted");
        Ok(())
    }

    /// Edit title / prompt / lyrics of an authoritative record
    ///
    /// Returns `None` for an empty edit (nothing is sent).
    pub async fn update_details(
        &self,
        id: &str,
        mut update: GenerationUpdate,
    ) -> Result<Option<GenerationRecord>, OrchestratorError> {
        if self.store.read().await.get(id).is_some() {
            return Err(OrchestratorError::InvalidInput(format!(
                "{} is still generating",
                id
            )));
        }

        update.title = update.title.as_deref().map(sanitize_title);
        if update.is_empty() {
            debug!(id = %id, "Empty details update ignored");
            return Ok(None);
        }

        let record = self.library.update_generation(id, &update).await?;
        self.reconciler.replace_record(record.clone()).await;
        Ok(Some(record))
    }

    /// Custom-mode prefill built from an existing record
    pub async fn reuse(&self, id: &str) -> Result<Submission, OrchestratorError> {
        let record = self.find_record(id).await?;
        Ok(Submission::from_record(&record))
    }

    /// Download a record's audio into `dir` as `<title>.wav`
    pub async fn download_audio(&self, id: &str, dir: &Path) -> Result<PathBuf, OrchestratorError> {
        let record = self.find_record(id).await?;
        let audio_url = record
            .audio_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| OrchestratorError::NotFound(format!("No audio for {}", id)))?;

        let bytes = self.library.fetch_audio(audio_url).await?;

        let stem = sanitize_file_name(record.title.as_deref().unwrap_or("song"), &record.id);
        let path = dir.join(format!("{}.wav", stem));
        tokio::fs::write(&path, &bytes).await?;

        info!(id = %id, path = %path.display(), bytes = bytes.len(), "Audio downloaded");
        Ok(path)
    }

    async fn find_record(&self, id: &str) -> Result<GenerationRecord, OrchestratorError> {
        if let Some(record) = self.reconciler.record(id).await {
            return Ok(record);
        }
        // Not in the snapshot yet (e.g. before the first poll)
        self.reconciler.tick().await?;
        self.reconciler
            .record(id)
            .await
            .ok_or_else(|| OrchestratorError::NotFound(format!("Generation {}", id)))
    }

    // ========================================
    // Cover regeneration
    // ========================================

    /// Start a cover regeneration; completion is detected by later polls
    ///
    /// The current cover URL must come from a snapshot containing the
    /// target, otherwise an unchanged URL would read as a new cover.
    pub async fn regenerate_cover(&self, id: &str) -> Result<Option<GenerationRecord>, OrchestratorError> {
        let mut history = self.reconciler.snapshot().await;
        if !history.iter().any(|record| record.id == id) {
            if let Some(report) = self.reconciler.tick_logged().await {
                history = report.history;
            }
        }
        self.covers.start(id, &history).await
    }

    pub async fn cover_regeneration(&self) -> Option<CoverRegenerationState> {
        self.covers.current().await
    }

    // ========================================
    // Polling
    // ========================================

    /// One reconciliation tick followed by the cover check
    pub async fn poll_history(&self) -> Option<ReconcileReport> {
        let report = self.reconciler.tick_logged().await?;
        self.covers.observe(&report.history).await;
        Some(report)
    }

    pub async fn poll_inventory(&self) -> ModelVariant {
        self.inventory.tick_logged().await;
        self.inventory.default_variant().await
    }

    /// Start the history and inventory loops; both stop on `cancel`
    pub fn spawn_pollers(self: &Arc<Self>, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let history_every = Duration::from_millis(self.polling.history_interval_ms);
        let inventory_every = Duration::from_millis(self.polling.inventory_interval_ms);

        let orchestrator = Arc::clone(self);
        let history_cancel = cancel.clone();
        let history = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(history_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = history_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        orchestrator.poll_history().await;
                    }
                }
            }
            debug!("History poller stopped");
        });

        let orchestrator = Arc::clone(self);
        let inventory = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inventory_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        orchestrator.poll_inventory().await;
                    }
                }
            }
            debug!("Inventory poller stopped");
        });

        info!(
            history_ms = self.polling.history_interval_ms,
            inventory_ms = self.polling.inventory_interval_ms,
            "Pollers started"
        );
        vec![history, inventory]
    }
}

fn new_pending_entry(submission: &Submission, model_variant: ModelVariant) -> PendingEntry {
    let raw_title = submission
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| Some(submission.prompt_text()).filter(|p| !p.trim().is_empty()))
        .unwrap_or(UNTITLED);

    PendingEntry::new(
        truncate_title(&sanitize_title(raw_title)),
        submission.prompt_text().to_string(),
        submission.is_instrumental(),
        submission.mode,
        model_variant,
        submission.task_type,
    )
}
