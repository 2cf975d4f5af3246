//! Generation submission handlers
//!
//! POST /generations, GET /generations/:temp_id, POST /llm

use ace_common::api::LlmTaskRequest;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::{
    error::{ApiError, ApiResult},
    models::{PendingEntry, Submission},
    AppState,
};

/// POST /generations response
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub temp_id: String,
    pub stage_labels: Vec<String>,
}

/// POST /llm response
#[derive(Debug, Serialize)]
pub struct AssistResponse {
    pub output: String,
}

/// POST /generations
///
/// Creates the pending entry and starts the chain. Returns 202 Accepted with
/// the temp id; progress arrives over `/events` and `/library`.
pub async fn submit_generation(
    State(state): State<AppState>,
    Json(submission): Json<Submission>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    if submission.weirdness > 100 || submission.style_influence > 100 {
        return Err(ApiError::BadRequest(
            "weirdness and style_influence must be within 0-100".to_string(),
        ));
    }

    let handle = state.orchestrator.submit(submission).await;
    let stage_labels = state
        .orchestrator
        .pending_entry(&handle.temp_id)
        .await
        .map(|entry| entry.stage_labels)
        .unwrap_or_default();

    tracing::info!(temp_id = %handle.temp_id, "Generation submitted");

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            temp_id: handle.temp_id,
            stage_labels,
        }),
    ))
}

/// GET /generations/:temp_id
pub async fn get_pending(
    State(state): State<AppState>,
    Path(temp_id): Path<String>,
) -> ApiResult<Json<PendingEntry>> {
    state
        .orchestrator
        .pending_entry(&temp_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Pending entry not found: {}", temp_id)))
}

/// POST /llm
///
/// Form assist (generate a prompt, lyrics or title outside a submission).
pub async fn assist(
    State(state): State<AppState>,
    Json(request): Json<LlmTaskRequest>,
) -> ApiResult<Json<AssistResponse>> {
    let output = state.orchestrator.assist(request).await?;
    Ok(Json(AssistResponse { output }))
}

/// Build generation routes
pub fn generation_routes() -> Router<AppState> {
    Router::new()
        .route("/generations", post(submit_generation))
        .route("/generations/:temp_id", get(get_pending))
        .route("/llm", post(assist))
}
