//! Domain models for the POS backend

mod product;
mod report;
mod sale;
mod stock;

pub use product::*;
pub use report::*;
pub use sale::*;
pub use stock::*;
