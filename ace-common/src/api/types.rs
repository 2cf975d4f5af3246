//! Shared backend request/response types
//!
//! Mirrors the JSON shapes of the ACE-Step backend REST API under `/api`.
//! The orchestrator only reads the authoritative records; it never writes
//! them except through the creation, update and delete endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ========================================
// Enumerations
// ========================================

/// Submission mode chosen on the create form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// One sentence idea, everything else generated
    #[default]
    Simple,
    /// User-authored prompt, lyrics and metadata
    Custom,
}

/// Backend task type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    #[default]
    Text2Music,
    Cover,
    Repaint,
}

/// DiT checkpoint variant used for synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    Base,
    #[default]
    Turbo,
    Shift,
}

impl ModelVariant {
    /// Fallback order when the preferred variant is not installed
    pub const PREFERENCE_ORDER: [ModelVariant; 3] =
        [ModelVariant::Turbo, ModelVariant::Shift, ModelVariant::Base];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelVariant::Base => "base",
            ModelVariant::Turbo => "turbo",
            ModelVariant::Shift => "shift",
        }
    }

    /// Model inventory id of the checkpoint backing this variant (e.g. `dit-turbo`)
    pub fn checkpoint_id(&self) -> String {
        format!("dit-{}", self.as_str())
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelVariant {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base" => Ok(ModelVariant::Base),
            "turbo" => Ok(ModelVariant::Turbo),
            "shift" => Ok(ModelVariant::Shift),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown model variant: {}",
                other
            ))),
        }
    }
}

/// Status of an authoritative generation record
///
/// The backend reports status as free text. `ready` and `failed` are terminal
/// and never revert; any other value is an in-progress state and is kept
/// verbatim so it round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GenerationStatus {
    Queued,
    Processing,
    Ready,
    Failed,
    Other(String),
}

impl GenerationStatus {
    /// True for statuses known never to change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Ready | GenerationStatus::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            GenerationStatus::Queued => "queued",
            GenerationStatus::Processing => "processing",
            GenerationStatus::Ready => "ready",
            GenerationStatus::Failed => "failed",
            GenerationStatus::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for GenerationStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "queued" => GenerationStatus::Queued,
            "processing" => GenerationStatus::Processing,
            "ready" => GenerationStatus::Ready,
            "failed" => GenerationStatus::Failed,
            _ => GenerationStatus::Other(value),
        }
    }
}

impl From<GenerationStatus> for String {
    fn from(value: GenerationStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ========================================
// Generation Types
// ========================================

/// Musical inputs of a creation request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationInputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,
    #[serde(default)]
    pub instrumental: bool,
    /// Beats per minute (backend accepts 30-300)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<u32>,
    /// Target duration (backend accepts 10-600)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_signature: Option<String>,
}

/// Creation payload sent to `POST /api/generations`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationCreate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub task_type: TaskType,
    #[serde(default)]
    pub mode: GenerationMode,
    #[serde(default)]
    pub model_variant: ModelVariant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_strength: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_icon: Option<String>,
    pub inputs: GenerationInputs,
    /// Free-form metadata (sampling parameters, image prompt, ...)
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Authoritative generation record as returned by `/api/history`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub task_type: TaskType,
    #[serde(default)]
    pub mode: GenerationMode,
    #[serde(default)]
    pub model_variant: ModelVariant,
    pub status: GenerationStatus,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub lyrics: Option<String>,
    /// Sent as `metadata_json` by the backend's ORM-backed responses
    #[serde(default, alias = "metadata_json")]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub instrumental: bool,
    #[serde(default)]
    pub cover_strength: Option<u8>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub bpm: Option<u32>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub time_signature: Option<String>,
    #[serde(default)]
    pub output_audio_path: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub cover_color: Option<String>,
    #[serde(default)]
    pub cover_icon: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    /// Backend timestamp text (ISO-8601, timezone not guaranteed)
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl GenerationRecord {
    /// Cover image URL, treating an empty string as absent
    pub fn cover_url(&self) -> Option<&str> {
        self.cover_image_url
            .as_deref()
            .filter(|url| !url.is_empty())
    }
}

/// Partial song-details edit sent to `PUT /api/generations/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,
}

impl GenerationUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.prompt.is_none() && self.lyrics.is_none()
    }
}

// ========================================
// LLM Task Types
// ========================================

/// Text generation task understood by `POST /api/llm`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmTask {
    /// Expand a seed idea into a music prompt
    Prompt,
    Lyrics,
    Title,
    /// Cover-art prompt
    Image,
}

impl LlmTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmTask::Prompt => "prompt",
            LlmTask::Lyrics => "lyrics",
            LlmTask::Title => "title",
            LlmTask::Image => "image",
        }
    }
}

impl fmt::Display for LlmTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmTaskRequest {
    pub task: LlmTask,
    pub seed_prompt: String,
    #[serde(default)]
    pub instrumental: bool,
    #[serde(default)]
    pub style_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl LlmTaskRequest {
    pub fn new(task: LlmTask, seed_prompt: impl Into<String>, instrumental: bool) -> Self {
        Self {
            task,
            seed_prompt: seed_prompt.into(),
            instrumental,
            style_tags: Vec::new(),
            language: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmTaskResponse {
    pub task: String,
    pub output: String,
    /// "ace" or "openai-compat"
    pub provider: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

// ========================================
// Model Inventory / Config Types
// ========================================

/// One checkpoint entry from `GET /api/models`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInventoryEntry {
    pub id: String,
    /// "available", "downloading", "missing" or "error"
    pub status: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl ModelInventoryEntry {
    pub fn is_available(&self) -> bool {
        self.status == "available"
    }
}

/// Subset of `GET /api/config` consumed by the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_image_provider")]
    pub image_generation_provider: String,
    #[serde(default)]
    pub default_model_variant: Option<String>,
}

fn default_image_provider() -> String {
    "none".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            image_generation_provider: default_image_provider(),
            default_model_variant: None,
        }
    }
}

impl BackendConfig {
    /// Preferred variant, ignoring values the orchestrator does not know
    pub fn preferred_variant(&self) -> Option<ModelVariant> {
        self.default_model_variant
            .as_deref()
            .and_then(|v| v.parse().ok())
    }
}

/// True when a cover-art provider other than "none" is configured
pub fn image_generation_enabled(provider: &str) -> bool {
    let provider = provider.trim();
    !provider.is_empty() && provider != "none"
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_terminal_and_round_trip() {
        let ready: GenerationStatus = serde_json::from_value(json!("ready")).unwrap();
        let failed: GenerationStatus = serde_json::from_value(json!("failed")).unwrap();
        let custom: GenerationStatus = serde_json::from_value(json!("rendering")).unwrap();

        assert!(ready.is_terminal());
        assert!(failed.is_terminal());
        assert!(!custom.is_terminal());
        assert!(!GenerationStatus::Queued.is_terminal());
        assert_eq!(serde_json::to_value(&custom).unwrap(), json!("rendering"));
    }

    #[test]
    fn test_task_type_wire_names() {
        assert_eq!(serde_json::to_value(TaskType::Text2Music).unwrap(), json!("text2music"));
        assert_eq!(serde_json::to_value(GenerationMode::Custom).unwrap(), json!("custom"));
        assert_eq!(serde_json::to_value(LlmTask::Image).unwrap(), json!("image"));
    }

    #[test]
    fn test_record_parses_backend_shape() {
        let record: GenerationRecord = serde_json::from_value(json!({
            "id": "abc",
            "title": "Night Drive",
            "task_type": "text2music",
            "mode": "simple",
            "model_variant": "turbo",
            "status": "processing",
            "prompt": "synthwave",
            "lyrics": null,
            "metadata": {"image_prompt": "neon"},
            "output_audio_path": null,
            "instrumental": false,
            "cover_strength": null,
            "duration_seconds": 120,
            "bpm": null,
            "key": null,
            "time_signature": null,
            "cover_color": "#ff00aa",
            "cover_icon": "wave",
            "cover_image_url": "",
            "created_at": "2024-05-01T10:00:00",
            "updated_at": "2024-05-01T10:00:01"
        }))
        .unwrap();

        assert_eq!(record.status, GenerationStatus::Processing);
        assert_eq!(record.duration_seconds, Some(120));
        assert_eq!(record.cover_url(), None);
    }

    #[test]
    fn test_model_variant_parse_and_checkpoint() {
        assert_eq!("TURBO".parse::<ModelVariant>().unwrap(), ModelVariant::Turbo);
        assert!("large".parse::<ModelVariant>().is_err());
        assert_eq!(ModelVariant::Shift.checkpoint_id(), "dit-shift");
    }

    #[test]
    fn test_image_generation_enabled() {
        assert!(!image_generation_enabled("none"));
        assert!(!image_generation_enabled(""));
        assert!(image_generation_enabled("fal"));
    }

    #[test]
    fn test_update_skips_unset_fields() {
        let update = GenerationUpdate {
            title: Some("New".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"title": "New"}));
        assert!(GenerationUpdate::default().is_empty());
    }
}
