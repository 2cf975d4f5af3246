//! ace-orchestrator library interface
//!
//! Song-generation orchestration over an ACE-Step backend: optimistic
//! pending entries, the staged generation chain, polling reconciliation and
//! cover regeneration tracking. Exposed as a library for integration tests
//! and driven by the `ace-orchestrator` binary.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod text;
pub mod tuning;
pub mod types;

pub use crate::error::{ApiError, ApiResult, BackendError, OrchestratorError};
pub use crate::orchestrator::Orchestrator;

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Owner of all orchestration state
    pub orchestrator: Arc<Orchestrator>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::generation_routes())
        .merge(api::library_routes())
        .merge(api::cover_routes())
        .merge(api::model_routes())
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
