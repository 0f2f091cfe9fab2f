//! Stock ledger models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a product's stock moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockMoveReason {
    Sale,
    Restock,
    Adjustment,
}

impl StockMoveReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockMoveReason::Sale => "sale",
            StockMoveReason::Restock => "restock",
            StockMoveReason::Adjustment => "adjustment",
        }
    }
}

impl TryFrom<String> for StockMoveReason {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "sale" => Ok(StockMoveReason::Sale),
            "restock" => Ok(StockMoveReason::Restock),
            "adjustment" => Ok(StockMoveReason::Adjustment),
            _ => Err(format!("unknown stock move reason: {value}")),
        }
    }
}

/// Append-only stock ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMove {
    pub id: i64,
    pub product_id: i64,
    /// Signed quantity; sales record `-qty`
    pub qty_change: i64,
    #[cfg_attr(feature = "sqlx", sqlx(try_from = "String"))]
    pub reason: StockMoveReason,
    /// Correlation to the originating record, e.g. a sale id
    #[cfg_attr(feature = "sqlx", sqlx(rename = "ref"))]
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}
