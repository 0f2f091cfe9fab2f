//! Shared types and models for the POS backend
//!
//! This crate contains the catalog and sales domain: persisted records,
//! request inputs, sale totals arithmetic and input validation. It performs
//! no I/O.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
