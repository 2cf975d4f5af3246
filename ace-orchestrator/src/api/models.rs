//! Model inventory handlers

use axum::{extract::State, routing::get, Json, Router};

use crate::{orchestrator::InventoryStatus, AppState};

/// GET /models/default
///
/// Variant used for submissions that do not pick one.
pub async fn default_model(State(state): State<AppState>) -> Json<InventoryStatus> {
    Json(state.orchestrator.inventory().status().await)
}

/// Build model routes
pub fn model_routes() -> Router<AppState> {
    Router::new().route("/models/default", get(default_model))
}
