//! Data models for the POS backend
//!
//! Re-exports the wire and row types from the shared crate

pub use shared::models::*;
