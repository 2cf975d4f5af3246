//! Orchestrator data models

pub mod pending_entry;
pub mod submission;

pub use pending_entry::{PendingEntry, PendingPatch, GENERATION_FAILED_MESSAGE};
pub use submission::Submission;
