//! # ACE Studio Common Library
//!
//! Shared code for the ACE Studio orchestrator and its tooling:
//! - Backend wire types (generation records, creation payloads, LLM tasks)
//! - Event types (StudioEvent enum) and the broadcast EventBus
//! - Bootstrap configuration loading
//! - Common error type

pub mod api;
pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
