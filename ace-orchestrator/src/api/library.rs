//! Library API handlers
//!
//! GET /library, DELETE /library/:id, PUT /library/:id, GET /library/:id/reuse

use ace_common::api::{GenerationRecord, GenerationUpdate};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::{
    error::ApiResult,
    models::Submission,
    orchestrator::LibraryItem,
    AppState,
};

/// GET /library response
#[derive(Debug, Serialize)]
pub struct LibraryResponse {
    pub items: Vec<LibraryItem>,
    pub pending_count: usize,
}

/// PUT /library/:id response
#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    /// False when the edit was empty and nothing was sent
    pub updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<GenerationRecord>,
}

/// GET /library
///
/// Pending entries first, then authoritative records not shadowed by one.
pub async fn list_library(State(state): State<AppState>) -> Json<LibraryResponse> {
    let items = state.orchestrator.library().await;
    let pending_count = items.iter().filter(|item| item.is_pending()).count();
    Json(LibraryResponse {
        items,
        pending_count,
    })
}

/// DELETE /library/:id
///
/// A temp id removes the pending card locally; its chain keeps running.
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.orchestrator.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /library/:id
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<GenerationUpdate>,
) -> ApiResult<Json<UpdateResponse>> {
    let record = state.orchestrator.update_details(&id, update).await?;
    Ok(Json(UpdateResponse {
        updated: record.is_some(),
        record,
    }))
}

/// GET /library/:id/reuse
///
/// Custom-mode form prefill from an existing record.
pub async fn reuse_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Submission>> {
    Ok(Json(state.orchestrator.reuse(&id).await?))
}

/// Build library routes
pub fn library_routes() -> Router<AppState> {
    Router::new()
        .route("/library", get(list_library))
        .route("/library/:id", axum::routing::delete(delete_item).put(update_item))
        .route("/library/:id/reuse", get(reuse_item))
}
