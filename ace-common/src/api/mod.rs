//! Backend API types shared across studio crates

pub mod types;

pub use types::*;
