//! Optimistic pending entry
//!
//! A pending entry represents one submission from the moment the user hits
//! "create" until the backend's authoritative record reaches a terminal
//! status. Stage progress is a UI marker, not a 1:1 map of internal
//! sub-tasks (title generation and submission have no stage of their own).

use ace_common::api::{GenerationMode, ModelVariant, TaskType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error text stored on an entry after a required step fails
pub const GENERATION_FAILED_MESSAGE: &str = "Generation failed. Try again.";

/// Stage labels for vocal requests
pub const VOCAL_STAGES: [&str; 4] = [
    "Shaping idea",
    "Writing lyrics",
    "Composing track",
    "Mixing audio",
];

/// Stage labels for instrumental requests (no lyrics stage)
pub const INSTRUMENTAL_STAGES: [&str; 3] = ["Shaping idea", "Composing track", "Mixing audio"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEntry {
    /// Client-generated id, never reused
    pub temp_id: String,
    /// Display title (already truncated for the card)
    pub title: String,
    /// Working description, replaced by idea expansion
    pub prompt: String,
    /// Fixed at creation: 3 labels (instrumental) or 4 (vocal)
    pub stage_labels: Vec<String>,
    /// Always within `0..stage_labels.len()`, never decreases
    pub stage_index: usize,
    pub instrumental: bool,
    pub mode: GenerationMode,
    pub model_variant: ModelVariant,
    pub task_type: TaskType,
    /// Set once when asset creation returns
    pub server_id: Option<String>,
    /// Set on required-step failure; freezes stage progress
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PendingEntry {
    pub fn new(
        title: String,
        prompt: String,
        instrumental: bool,
        mode: GenerationMode,
        model_variant: ModelVariant,
        task_type: TaskType,
    ) -> Self {
        let labels: &[&str] = if instrumental {
            &INSTRUMENTAL_STAGES
        } else {
            &VOCAL_STAGES
        };

        Self {
            temp_id: new_temp_id(),
            title,
            prompt,
            stage_labels: labels.iter().map(|s| s.to_string()).collect(),
            stage_index: 0,
            instrumental,
            mode,
            model_variant,
            task_type,
            server_id: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn current_stage(&self) -> &str {
        self.stage_labels
            .get(self.stage_index)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn last_stage_index(&self) -> usize {
        self.stage_labels.len().saturating_sub(1)
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Shallow partial update for a pending entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingPatch {
    pub title: Option<String>,
    pub prompt: Option<String>,
    pub server_id: Option<String>,
    pub error: Option<String>,
}

impl PendingPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Default::default()
        }
    }

    pub fn server_id(server_id: impl Into<String>) -> Self {
        Self {
            server_id: Some(server_id.into()),
            ..Default::default()
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

fn new_temp_id() -> String {
    format!("temp-{}", Uuid::new_v4().simple())
}
