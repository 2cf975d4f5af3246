//! User submission (create-form values)

use ace_common::api::{
    GenerationInputs, GenerationMode, GenerationRecord, ModelVariant, TaskType,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tuning::{DEFAULT_STYLE_INFLUENCE, DEFAULT_WEIRDNESS};

/// One create request as entered by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub mode: GenerationMode,
    #[serde(default)]
    pub task_type: TaskType,
    /// `None` uses the inventory's current default variant
    #[serde(default)]
    pub model_variant: Option<ModelVariant>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub inputs: GenerationInputs,
    /// User-authored metadata, merged into the payload metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// 0-100, drives LM temperature / top-p / top-k
    #[serde(default = "default_weirdness")]
    pub weirdness: u8,
    /// 0-100, drives guidance scale
    #[serde(default = "default_style_influence")]
    pub style_influence: u8,
    #[serde(default)]
    pub cover_strength: Option<u8>,
}

fn default_weirdness() -> u8 {
    DEFAULT_WEIRDNESS
}

fn default_style_influence() -> u8 {
    DEFAULT_STYLE_INFLUENCE
}

impl Default for Submission {
    fn default() -> Self {
        Self {
            mode: GenerationMode::Simple,
            task_type: TaskType::Text2Music,
            model_variant: None,
            title: None,
            inputs: GenerationInputs::default(),
            metadata: Map::new(),
            weirdness: DEFAULT_WEIRDNESS,
            style_influence: DEFAULT_STYLE_INFLUENCE,
            cover_strength: None,
        }
    }
}

impl Submission {
    /// Simple-mode submission from a one-sentence idea
    pub fn simple(idea: impl Into<String>, instrumental: bool) -> Self {
        Self {
            inputs: GenerationInputs {
                prompt: Some(idea.into()),
                instrumental,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Custom-mode submission with user-authored prompt and lyrics
    pub fn custom(
        title: Option<String>,
        prompt: impl Into<String>,
        lyrics: impl Into<String>,
        instrumental: bool,
    ) -> Self {
        Self {
            mode: GenerationMode::Custom,
            title,
            inputs: GenerationInputs {
                prompt: Some(prompt.into()),
                lyrics: Some(lyrics.into()),
                instrumental,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Custom-mode prefill reusing an existing record's settings
    pub fn from_record(record: &GenerationRecord) -> Self {
        let slider = |key: &str, default: u8| {
            record
                .metadata
                .get(key)
                .and_then(Value::as_f64)
                .map(|v| v.clamp(0.0, 100.0).round() as u8)
                .unwrap_or(default)
        };

        Self {
            mode: GenerationMode::Custom,
            task_type: record.task_type,
            model_variant: Some(record.model_variant),
            title: Some(record.title.clone().unwrap_or_default()),
            inputs: GenerationInputs {
                prompt: Some(record.prompt.clone().unwrap_or_default()),
                lyrics: Some(record.lyrics.clone().unwrap_or_default()),
                instrumental: record.instrumental,
                bpm: record.bpm,
                duration_seconds: record.duration_seconds,
                key: record.key.clone(),
                time_signature: record.time_signature.clone(),
            },
            metadata: record.metadata.clone(),
            weirdness: slider("weirdness", DEFAULT_WEIRDNESS),
            style_influence: slider("style_influence", DEFAULT_STYLE_INFLUENCE),
            cover_strength: record.cover_strength,
        }
    }

    pub fn is_instrumental(&self) -> bool {
        self.inputs.instrumental
    }

    /// Raw prompt text, empty when unset
    pub fn prompt_text(&self) -> &str {
        self.inputs.prompt.as_deref().unwrap_or_default()
    }
}
