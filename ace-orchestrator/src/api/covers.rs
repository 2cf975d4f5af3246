//! Cover regeneration handlers

use ace_common::api::GenerationRecord;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::{error::ApiResult, orchestrator::CoverRegenerationState, AppState};

/// POST /library/:id/cover/regenerate response
#[derive(Debug, Serialize)]
pub struct RegenerateResponse {
    pub target_id: String,
    /// Record returned by the backend, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<GenerationRecord>,
}

/// GET /cover-regeneration response
#[derive(Debug, Serialize)]
pub struct CoverStatusResponse {
    pub active: Option<CoverRegenerationState>,
}

/// POST /library/:id/cover/regenerate
///
/// Completion is reported later by the history poll (`CoverRegenerationCompleted`).
pub async fn regenerate_cover(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<RegenerateResponse>)> {
    let record = state.orchestrator.regenerate_cover(&id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(RegenerateResponse {
            target_id: id,
            record,
        }),
    ))
}

/// GET /cover-regeneration
pub async fn cover_status(State(state): State<AppState>) -> Json<CoverStatusResponse> {
    Json(CoverStatusResponse {
        active: state.orchestrator.cover_regeneration().await,
    })
}

/// Build cover routes
pub fn cover_routes() -> Router<AppState> {
    Router::new()
        .route("/library/:id/cover/regenerate", post(regenerate_cover))
        .route("/cover-regeneration", get(cover_status))
}
