//! HTTP handlers for the POS backend

pub mod health;
pub mod products;
pub mod reporting;
pub mod sales;

pub use health::*;
pub use products::*;
pub use reporting::*;
pub use sales::*;
