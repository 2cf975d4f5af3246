//! Stage sequencer: one submission → ordered chain of generation steps
//!
//! # Step plans
//! - **Simple:** ExpandIdea → WriteLyrics → GenerateTitle → ImagePrompt → ComposeMarker → Submit
//! - **Custom:** PrepareCustomInputs → ImagePrompt → ComposeMarker → Submit
//!
//! Steps run strictly in plan order, one at a time. Each step yields a tagged
//! [`StepOutcome`]; the first `Fatal` outcome stops the chain and freezes the
//! pending entry with [`GENERATION_FAILED_MESSAGE`]. ImagePrompt is the only
//! optional step: its failures are `Recovered` and never stop the chain.
//!
//! Stage advances happen after ExpandIdea, after WriteLyrics (vocal only),
//! at ComposeMarker, and after a successful Submit. Instrumental requests
//! have no lyrics stage label, so indices stay aligned with the labels.

use ace_common::api::{
    image_generation_enabled, GenerationCreate, GenerationInputs, GenerationMode, LlmTask,
    LlmTaskRequest, ModelVariant,
};
use ace_common::events::{EventBus, StudioEvent};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::pending_store::SharedPendingStore;
use crate::config::ProviderSettings;
use crate::error::BackendError;
use crate::models::{PendingPatch, Submission, GENERATION_FAILED_MESSAGE};
use crate::text::{
    sanitize_title, title_seed, truncate_title, unset_auto, with_lyrics_instruction,
    EMPTY_IDEA_SEED, INSTRUMENTAL_LYRICS, UNTITLED,
};
use crate::tuning;
use crate::types::{AssetCreator, LlmTaskExecutor};

/// Named step of a generation chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Required: seed idea → full music prompt
    ExpandIdea,
    /// Required unless instrumental
    WriteLyrics,
    /// Required, not a tracked stage
    GenerateTitle,
    /// Custom mode: trim user inputs, sanitize title
    PrepareCustomInputs,
    /// Optional cover-art prompt
    ImagePrompt,
    /// Progress marker before submission
    ComposeMarker,
    /// Required: create the asset on the backend
    Submit,
}

const SIMPLE_PLAN: [Step; 6] = [
    Step::ExpandIdea,
    Step::WriteLyrics,
    Step::GenerateTitle,
    Step::ImagePrompt,
    Step::ComposeMarker,
    Step::Submit,
];

const CUSTOM_PLAN: [Step; 4] = [
    Step::PrepareCustomInputs,
    Step::ImagePrompt,
    Step::ComposeMarker,
    Step::Submit,
];

impl Step {
    /// Ordered steps for a submission mode
    pub fn plan(mode: GenerationMode) -> &'static [Step] {
        match mode {
            GenerationMode::Simple => &SIMPLE_PLAN,
            GenerationMode::Custom => &CUSTOM_PLAN,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::ExpandIdea => "expand_idea",
            Step::WriteLyrics => "write_lyrics",
            Step::GenerateTitle => "generate_title",
            Step::PrepareCustomInputs => "prepare_custom_inputs",
            Step::ImagePrompt => "image_prompt",
            Step::ComposeMarker => "compose_marker",
            Step::Submit => "submit",
        }
    }
}

/// Per-step tagged outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Ok,
    /// Step not applicable (instrumental lyrics, image provider disabled)
    Skipped,
    /// Optional step failed; fallback value used
    Recovered(String),
    /// Required step failed; chain aborted
    Fatal(String),
}

impl StepOutcome {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StepOutcome::Fatal(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub step: Step,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Result of one sequencer run
#[derive(Debug, Clone, Serialize)]
pub struct SequenceReport {
    pub temp_id: String,
    pub steps: Vec<StepRecord>,
    /// Payload handed to asset creation (absent if the chain stopped earlier)
    pub payload: Option<GenerationCreate>,
    /// Server id returned by asset creation
    pub server_id: Option<String>,
}

impl SequenceReport {
    pub fn succeeded(&self) -> bool {
        self.server_id.is_some()
    }

    pub fn outcome_of(&self, step: Step) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|record| record.step == step)
            .map(|record| &record.outcome)
    }

    pub fn fatal_step(&self) -> Option<Step> {
        self.steps
            .iter()
            .find(|record| record.outcome.is_fatal())
            .map(|record| record.step)
    }
}

/// Working values threaded through the steps of one run
struct SequenceContext<'a> {
    submission: &'a Submission,
    model_variant: ModelVariant,
    prompt: String,
    lyrics: String,
    /// Sanitized, untruncated title for the payload
    title: String,
    image_prompt: Option<String>,
    payload: Option<GenerationCreate>,
    server_id: Option<String>,
}

impl<'a> SequenceContext<'a> {
    fn new(submission: &'a Submission, model_variant: ModelVariant) -> Self {
        Self {
            submission,
            model_variant,
            prompt: submission.prompt_text().to_string(),
            lyrics: submission.inputs.lyrics.clone().unwrap_or_default(),
            title: submission
                .title
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            image_prompt: None,
            payload: None,
            server_id: None,
        }
    }

    fn instrumental(&self) -> bool {
        self.submission.is_instrumental()
    }
}

/// Drives the step chain for one submission at a time
///
/// Cheap to clone; each run is independent and only touches the pending
/// entry named by its temp id.
#[derive(Clone)]
pub struct StageSequencer {
    llm: Arc<dyn LlmTaskExecutor>,
    assets: Arc<dyn AssetCreator>,
    store: SharedPendingStore,
    event_bus: EventBus,
    settings: ProviderSettings,
}

impl StageSequencer {
    pub fn new(
        llm: Arc<dyn LlmTaskExecutor>,
        assets: Arc<dyn AssetCreator>,
        store: SharedPendingStore,
        event_bus: EventBus,
        settings: ProviderSettings,
    ) -> Self {
        Self {
            llm,
            assets,
            store,
            event_bus,
            settings,
        }
    }

    /// Run every step of the submission's plan against its pending entry
    pub async fn run(
        &self,
        temp_id: &str,
        submission: &Submission,
        model_variant: ModelVariant,
    ) -> SequenceReport {
        let mut ctx = SequenceContext::new(submission, model_variant);
        let mut steps = Vec::new();

        info!(
            temp_id = %temp_id,
            mode = ?submission.mode,
            instrumental = submission.is_instrumental(),
            variant = %model_variant,
            "Generation chain started"
        );

        for &step in Step::plan(submission.mode) {
            let outcome = match self.execute(step, temp_id, &mut ctx).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(temp_id = %temp_id, step = step.as_str(), error = %e, "Generation step failed");
                    StepOutcome::Fatal(e.to_string())
                }
            };
            debug!(temp_id = %temp_id, step = step.as_str(), outcome = ?outcome, "Step finished");

            let fatal = outcome.is_fatal();
            steps.push(StepRecord { step, outcome });
            if fatal {
                self.fail(temp_id).await;
                break;
            }
        }

        if let Some(server_id) = &ctx.server_id {
            info!(temp_id = %temp_id, server_id = %server_id, "Generation chain submitted");
        }

        SequenceReport {
            temp_id: temp_id.to_string(),
            steps,
            payload: ctx.payload,
            server_id: ctx.server_id,
        }
    }

    async fn execute(
        &self,
        step: Step,
        temp_id: &str,
        ctx: &mut SequenceContext<'_>,
    ) -> Result<StepOutcome, BackendError> {
        match step {
            Step::ExpandIdea => self.expand_idea(temp_id, ctx).await,
            Step::WriteLyrics => self.write_lyrics(temp_id, ctx).await,
            Step::GenerateTitle => self.generate_title(temp_id, ctx).await,
            Step::PrepareCustomInputs => Ok(self.prepare_custom_inputs(temp_id, ctx).await),
            Step::ImagePrompt => Ok(self.image_prompt(temp_id, ctx).await),
            Step::ComposeMarker => {
                self.advance(temp_id).await;
                Ok(StepOutcome::Ok)
            }
            Step::Submit => self.submit(temp_id, ctx).await,
        }
    }

    async fn expand_idea(
        &self,
        temp_id: &str,
        ctx: &mut SequenceContext<'_>,
    ) -> Result<StepOutcome, BackendError> {
        let seed = ctx.submission.prompt_text().trim();
        let seed = if seed.is_empty() { EMPTY_IDEA_SEED } else { seed };

        let expanded = self
            .llm
            .run_llm_task(LlmTaskRequest::new(LlmTask::Prompt, seed, ctx.instrumental()))
            .await?;

        ctx.prompt = expanded.clone();
        self.patch(temp_id, PendingPatch::prompt(expanded)).await;
        self.advance(temp_id).await;
        Ok(StepOutcome::Ok)
    }

    async fn write_lyrics(
        &self,
        temp_id: &str,
        ctx: &mut SequenceContext<'_>,
    ) -> Result<StepOutcome, BackendError> {
        if ctx.instrumental() {
            ctx.lyrics = INSTRUMENTAL_LYRICS.to_string();
            return Ok(StepOutcome::Skipped);
        }

        let seed = with_lyrics_instruction(&ctx.prompt);
        ctx.lyrics = self
            .llm
            .run_llm_task(LlmTaskRequest::new(LlmTask::Lyrics, seed, false))
            .await?;

        self.advance(temp_id).await;
        Ok(StepOutcome::Ok)
    }

    async fn generate_title(
        &self,
        temp_id: &str,
        ctx: &mut SequenceContext<'_>,
    ) -> Result<StepOutcome, BackendError> {
        let generated = self
            .llm
            .run_llm_task(LlmTaskRequest::new(
                LlmTask::Title,
                title_seed(&ctx.prompt),
                ctx.instrumental(),
            ))
            .await?;

        ctx.title = sanitize_title(&generated);
        self.patch(temp_id, PendingPatch::title(truncate_title(&ctx.title)))
            .await;
        Ok(StepOutcome::Ok)
    }

    async fn prepare_custom_inputs(
        &self,
        temp_id: &str,
        ctx: &mut SequenceContext<'_>,
    ) -> StepOutcome {
        ctx.prompt = ctx.submission.prompt_text().trim().to_string();
        if ctx.instrumental() {
            ctx.lyrics = INSTRUMENTAL_LYRICS.to_string();
        }

        let raw_title = if !ctx.title.is_empty() {
            ctx.title.clone()
        } else if !ctx.prompt.is_empty() {
            ctx.prompt.clone()
        } else {
            UNTITLED.to_string()
        };
        ctx.title = sanitize_title(&raw_title);

        self.patch(
            temp_id,
            PendingPatch {
                title: Some(truncate_title(&ctx.title)),
                prompt: Some(ctx.prompt.clone()),
                ..Default::default()
            },
        )
        .await;
        StepOutcome::Ok
    }

    /// Optional: failures fall back to the music prompt
    async fn image_prompt(&self, temp_id: &str, ctx: &mut SequenceContext<'_>) -> StepOutcome {
        ctx.image_prompt = Some(ctx.prompt.clone());

        if !image_generation_enabled(&self.settings.image_generation_provider) {
            return StepOutcome::Skipped;
        }

        let request = LlmTaskRequest::new(LlmTask::Image, ctx.prompt.clone(), ctx.instrumental());
        match self.llm.run_llm_task(request).await {
            Ok(generated) if !generated.trim().is_empty() => {
                ctx.image_prompt = Some(generated);
                StepOutcome::Ok
            }
            Ok(_) => StepOutcome::Recovered("empty image prompt".to_string()),
            Err(e) => {
                warn!(temp_id = %temp_id, error = %e, "Image prompt generation failed, using music prompt");
                StepOutcome::Recovered(e.to_string())
            }
        }
    }

    async fn submit(
        &self,
        temp_id: &str,
        ctx: &mut SequenceContext<'_>,
    ) -> Result<StepOutcome, BackendError> {
        let payload = assemble_payload(ctx);
        ctx.payload = Some(payload.clone());

        let record = self.assets.create_asset(&payload).await?;

        self.advance(temp_id).await;
        self.bind(temp_id, &record.id).await;
        ctx.server_id = Some(record.id);
        Ok(StepOutcome::Ok)
    }

    // ------------------------------------------------------------------
    // Pending-entry mutations (each also emits an event)
    // ------------------------------------------------------------------

    async fn advance(&self, temp_id: &str) {
        let advanced = {
            let mut store = self.store.write().await;
            store
                .advance(temp_id)
                .and_then(|_| store.get(temp_id))
                .map(|entry| (entry.stage_index, entry.current_stage().to_string()))
        };

        match advanced {
            Some((stage_index, stage_label)) => {
                self.event_bus.emit_lossy(StudioEvent::StageAdvanced {
                    temp_id: temp_id.to_string(),
                    stage_index,
                    stage_label,
                    timestamp: Utc::now(),
                });
            }
            None => debug!(temp_id = %temp_id, "Pending entry gone or frozen; stage advance discarded"),
        }
    }

    async fn patch(&self, temp_id: &str, patch: PendingPatch) {
        let applied = self.store.write().await.patch(temp_id, patch);
        if !applied {
            debug!(temp_id = %temp_id, "Pending entry gone; update discarded");
        }
    }

    async fn bind(&self, temp_id: &str, server_id: &str) {
        let applied = self
            .store
            .write()
            .await
            .patch(temp_id, PendingPatch::server_id(server_id));

        if applied {
            self.event_bus.emit_lossy(StudioEvent::PendingBound {
                temp_id: temp_id.to_string(),
                server_id: server_id.to_string(),
                timestamp: Utc::now(),
            });
        } else {
            warn!(
                temp_id = %temp_id,
                server_id = %server_id,
                "Pending entry deleted before submission returned; result discarded"
            );
        }
    }

    async fn fail(&self, temp_id: &str) {
        let applied = self
            .store
            .write()
            .await
            .patch(temp_id, PendingPatch::error(GENERATION_FAILED_MESSAGE));

        if applied {
            self.event_bus.emit_lossy(StudioEvent::PendingFailed {
                temp_id: temp_id.to_string(),
                error: GENERATION_FAILED_MESSAGE.to_string(),
                timestamp: Utc::now(),
            });
        }
    }
}

/// Build the creation payload from the working values
fn assemble_payload(ctx: &SequenceContext<'_>) -> GenerationCreate {
    let submission = ctx.submission;

    let mut metadata = submission.metadata.clone();
    tuning::apply_to_metadata(&mut metadata, submission.weirdness, submission.style_influence);
    let image_prompt = ctx.image_prompt.clone().unwrap_or_else(|| ctx.prompt.clone());
    metadata.insert("image_prompt".into(), Value::from(image_prompt));

    GenerationCreate {
        title: Some(ctx.title.clone()),
        task_type: submission.task_type,
        mode: submission.mode,
        model_variant: ctx.model_variant,
        cover_strength: submission.cover_strength,
        cover_color: None,
        cover_icon: None,
        inputs: GenerationInputs {
            prompt: Some(ctx.prompt.clone()),
            lyrics: Some(ctx.lyrics.clone()),
            instrumental: submission.is_instrumental(),
            bpm: submission.inputs.bpm,
            duration_seconds: submission.inputs.duration_seconds,
            key: unset_auto(submission.inputs.key.as_deref()),
            time_signature: unset_auto(submission.inputs.time_signature.as_deref()),
        },
        metadata,
    }
}
