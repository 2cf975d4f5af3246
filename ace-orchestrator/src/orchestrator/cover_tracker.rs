//! Cover-art regeneration tracking
//!
//! The backend regenerates covers asynchronously and never reports
//! completion. The tracker records the cover URL at request time and treats
//! any later non-empty, different URL for the same record as completion.
//!
//! Single slot: a new request replaces tracking of the previous one.

use ace_common::api::GenerationRecord;
use ace_common::events::{EventBus, StudioEvent};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::OrchestratorError;
use crate::types::CoverRegenerator;

/// User-facing message for a rejected regeneration request
pub const COVER_REGENERATION_FAILED_MESSAGE: &str =
    "Cover regeneration failed. Please check your image generation settings and try again.";

/// Active regeneration slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverRegenerationState {
    pub target_id: String,
    pub previous_cover_url: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip)]
    request_id: u64,
}

pub struct CoverRegenerationTracker {
    regenerator: Arc<dyn CoverRegenerator>,
    event_bus: EventBus,
    slot: Mutex<Option<CoverRegenerationState>>,
    next_request_id: AtomicU64,
}

impl CoverRegenerationTracker {
    pub fn new(regenerator: Arc<dyn CoverRegenerator>, event_bus: EventBus) -> Self {
        Self {
            regenerator,
            event_bus,
            slot: Mutex::new(None),
            next_request_id: AtomicU64::new(1),
        }
    }

    /// Occupy the slot for `target_id` and issue the regeneration request
    ///
    /// `history` is the latest snapshot, used to capture the current cover
    /// URL. On request failure the slot is cleared (unless a newer request
    /// already replaced it) and the user-facing message is returned.
    pub async fn start(
        &self,
        target_id: &str,
        history: &[GenerationRecord],
    ) -> Result<Option<GenerationRecord>, OrchestratorError> {
        let previous_cover_url = history
            .iter()
            .find(|record| record.id == target_id)
            .and_then(GenerationRecord::cover_url)
            .map(str::to_string);
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut slot = self.slot.lock().await;
            if let Some(replaced) = slot.as_ref() {
                debug!(
                    replaced = %replaced.target_id,
                    target_id = %target_id,
                    "Cover regeneration tracking replaced"
                );
            }
            *slot = Some(CoverRegenerationState {
                target_id: target_id.to_string(),
                previous_cover_url,
                started_at: Utc::now(),
                request_id,
            });
        }

        self.event_bus.emit_lossy(StudioEvent::CoverRegenerationStarted {
            target_id: target_id.to_string(),
            timestamp: Utc::now(),
        });
        info!(target_id = %target_id, "Cover regeneration requested");

        match self.regenerator.regenerate_cover(target_id).await {
            Ok(record) => Ok(record),
            Err(e) => {
                error!(target_id = %target_id, error = %e, "Cover regeneration request failed");

                {
                    let mut slot = self.slot.lock().await;
                    if slot.as_ref().map(|s| s.request_id) == Some(request_id) {
                        *slot = None;
                    }
                }

                self.event_bus.emit_lossy(StudioEvent::CoverRegenerationFailed {
                    target_id: target_id.to_string(),
                    message: COVER_REGENERATION_FAILED_MESSAGE.to_string(),
                    timestamp: Utc::now(),
                });
                Err(OrchestratorError::CoverRegeneration(
                    COVER_REGENERATION_FAILED_MESSAGE.to_string(),
                ))
            }
        }
    }

    /// Check a polled history against the active slot
    ///
    /// Returns the new cover URL when the slot cleared on this call.
    pub async fn observe(&self, history: &[GenerationRecord]) -> Option<String> {
        let completed = {
            let mut slot = self.slot.lock().await;
            let state = slot.as_ref()?;

            let current = history
                .iter()
                .find(|record| record.id == state.target_id)
                .and_then(GenerationRecord::cover_url)?;

            if Some(current) == state.previous_cover_url.as_deref() {
                return None;
            }

            let completed = (state.target_id.clone(), current.to_string());
            *slot = None;
            completed
        };

        let (target_id, cover_url) = completed;
        info!(target_id = %target_id, cover_url = %cover_url, "Cover regeneration completed");
        self.event_bus.emit_lossy(StudioEvent::CoverRegenerationCompleted {
            target_id,
            cover_url: cover_url.clone(),
            timestamp: Utc::now(),
        });
        Some(cover_url)
    }

    pub async fn current(&self) -> Option<CoverRegenerationState> {
        self.slot.lock().await.clone()
    }

    pub async fn is_generating(&self, target_id: &str) -> bool {
        self.slot
            .lock()
            .await
            .as_ref()
            .is_some_and(|state| state.target_id == target_id)
    }
}
