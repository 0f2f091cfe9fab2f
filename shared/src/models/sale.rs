//! Sale models and totals arithmetic

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::types::Amount;

/// Cashier recorded when the request does not name one
pub const DEFAULT_CASHIER: &str = "kasir";

/// Flat tax placeholder; no tax is computed
pub const FLAT_TAX: Amount = 0;

/// A committed sale header
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: Uuid,
    pub datetime: DateTime<Utc>,
    pub cashier: String,
    pub subtotal: Amount,
    pub discount: Amount,
    pub tax: Amount,
    pub total: Amount,
    pub pay_cash: Amount,
    pub pay_edc: Amount,
    pub pay_qr: Amount,
    pub change: Amount,
    pub note: String,
    pub idempotency_key: Option<String>,
}

/// A sale line joined with the product name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItemDetail {
    pub id: i64,
    pub sale_id: Uuid,
    pub product_id: i64,
    pub qty: i64,
    /// Unit price snapshot taken at the time of sale
    pub price: Amount,
    pub discount: Amount,
    pub total: Amount,
    pub name: String,
}

/// Sale header plus its lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItemDetail>,
}

/// Input for recording a sale
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewSale {
    /// Client token for safe retries; a repeated key returns the first receipt
    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "idempotency_key must be 1-128 characters"))]
    pub idempotency_key: Option<String>,
    #[serde(default = "default_cashier")]
    #[validate(length(min = 1, max = 64, message = "cashier must be 1-64 characters"))]
    pub cashier: String,
    #[serde(default)]
    pub items: Vec<NewSaleItem>,
    #[serde(default)]
    pub discount: Amount,
    #[serde(default)]
    pub pay_cash: Amount,
    #[serde(default)]
    pub pay_edc: Amount,
    #[serde(default)]
    pub pay_qr: Amount,
    #[serde(default)]
    #[validate(length(max = 500, message = "note must be at most 500 characters"))]
    pub note: String,
}

fn default_cashier() -> String {
    DEFAULT_CASHIER.to_string()
}

impl NewSale {
    pub fn payments(&self) -> Payments {
        Payments {
            cash: self.pay_cash,
            edc: self.pay_edc,
            qr: self.pay_qr,
        }
    }
}

/// One line of a sale request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSaleItem {
    pub product_id: i64,
    pub qty: i64,
    pub price: Amount,
    #[serde(default)]
    pub discount: Amount,
}

impl NewSaleItem {
    /// `qty * price - discount`, or `None` on overflow
    pub fn line_total(&self) -> Option<Amount> {
        self.qty.checked_mul(self.price)?.checked_sub(self.discount)
    }
}

/// Tendered amounts per payment channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payments {
    pub cash: Amount,
    /// Card terminal (EDC)
    pub edc: Amount,
    pub qr: Amount,
}

impl Payments {
    pub fn total(&self) -> Option<Amount> {
        self.cash.checked_add(self.edc)?.checked_add(self.qr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TotalsError {
    #[error("amount overflow in item {0}")]
    ItemOverflow(usize),
    #[error("amount overflow in sale totals")]
    Overflow,
}

/// Derived header amounts of a sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTotals {
    pub subtotal: Amount,
    pub discount: Amount,
    pub tax: Amount,
    pub total: Amount,
    pub paid: Amount,
    pub change: Amount,
}

impl SaleTotals {
    /// subtotal = Σ(price * qty - item discount)
    /// total = max(0, subtotal - discount + tax)
    /// change = max(0, payments - total)
    pub fn compute(
        items: &[NewSaleItem],
        discount: Amount,
        payments: Payments,
    ) -> Result<Self, TotalsError> {
        let mut subtotal: Amount = 0;
        for (index, item) in items.iter().enumerate() {
            let line = item.line_total().ok_or(TotalsError::ItemOverflow(index))?;
            subtotal = subtotal
                .checked_add(line)
                .ok_or(TotalsError::ItemOverflow(index))?;
        }

        let tax = FLAT_TAX;
        let total = subtotal
            .checked_sub(discount)
            .and_then(|t| t.checked_add(tax))
            .ok_or(TotalsError::Overflow)?
            .max(0);

        let paid = payments.total().ok_or(TotalsError::Overflow)?;
        let change = paid.checked_sub(total).ok_or(TotalsError::Overflow)?.max(0);

        Ok(Self {
            subtotal,
            discount,
            tax,
            total,
            paid,
            change,
        })
    }
}

/// Response of a recorded sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleReceipt {
    pub id: Uuid,
    pub total: Amount,
    pub change: Amount,
    /// Set when an earlier sale with the same idempotency key was returned
    #[serde(skip)]
    pub replayed: bool,
}
