//! Product catalog models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::Amount;

/// Unit label used when a product is created without one
pub const DEFAULT_UNIT: &str = "pcs";

/// A catalog product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub name: String,
    /// Selling price in the smallest currency unit
    pub price: Amount,
    /// On-hand quantity. Concurrent sales can drive this below zero.
    pub stock: i64,
    pub unit: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a product
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 64, message = "sku must be 1-64 characters"))]
    pub sku: Option<String>,
    #[validate(length(min = 1, max = 64, message = "barcode must be 1-64 characters"))]
    pub barcode: Option<String>,
    #[validate(
        required(message = "name & price (integer) required"),
        length(min = 1, max = 200, message = "name must be 1-200 characters")
    )]
    pub name: Option<String>,
    #[validate(required(message = "name & price (integer) required"))]
    pub price: Option<Amount>,
    #[serde(default)]
    pub stock: i64,
    #[validate(length(min = 1, max = 32, message = "unit must be 1-32 characters"))]
    pub unit: Option<String>,
}

impl NewProduct {
    pub fn unit_or_default(&self) -> &str {
        self.unit.as_deref().unwrap_or(DEFAULT_UNIT)
    }
}
