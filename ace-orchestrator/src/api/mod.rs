//! Local HTTP surface for ace-orchestrator
//!
//! Stands in for the studio UI: submit, list, edit and delete generations,
//! trigger cover regeneration, and stream progress over SSE.

pub mod covers;
pub mod generations;
pub mod health;
pub mod library;
pub mod models;
pub mod sse;

pub use covers::cover_routes;
pub use generations::generation_routes;
pub use health::health_routes;
pub use library::library_routes;
pub use models::model_routes;
pub use sse::event_stream;
