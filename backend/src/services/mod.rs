//! Business logic services for the POS backend

pub mod catalog;
pub mod reporting;
pub mod sales;

pub use catalog::CatalogService;
pub use reporting::ReportingService;
pub use sales::SaleService;
