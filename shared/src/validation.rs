//! Validation utilities for the POS backend
//!
//! Every check here runs before a request touches the database.

use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::models::{NewProduct, NewSale};

/// A rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// First failing field of a derived `Validate` run, by field name
pub fn first_field_error(errors: &ValidationErrors) -> Option<FieldError> {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.keys().copied().collect();
    fields.sort_unstable();

    fields.into_iter().find_map(|field| {
        let error = field_errors.get(field)?.first()?;
        let message = error
            .message
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| format!("{} is invalid ({})", field, error.code));
        Some(FieldError::new(field, message))
    })
}

fn run_derived(input: &impl Validate) -> Result<(), FieldError> {
    match input.validate() {
        Ok(()) => Ok(()),
        Err(errors) => Err(first_field_error(&errors)
            .unwrap_or_else(|| FieldError::new("body", "invalid request"))),
    }
}

// ============================================================================
// Catalog Validations
// ============================================================================

/// Validate product creation input
pub fn validate_new_product(input: &NewProduct) -> Result<(), FieldError> {
    run_derived(input)?;

    if input.name.as_deref().map(str::trim).unwrap_or_default().is_empty() {
        return Err(FieldError::new("name", "name & price (integer) required"));
    }
    if matches!(input.price, Some(price) if price < 0) {
        return Err(FieldError::new("price", "price must be a non-negative integer"));
    }
    Ok(())
}

// ============================================================================
// Sale Validations
// ============================================================================

/// Validate a sale request
pub fn validate_new_sale(input: &NewSale) -> Result<(), FieldError> {
    if input.items.is_empty() {
        return Err(FieldError::new("items", "items required"));
    }

    run_derived(input)?;

    for (field, amount) in [
        ("discount", input.discount),
        ("pay_cash", input.pay_cash),
        ("pay_edc", input.pay_edc),
        ("pay_qr", input.pay_qr),
    ] {
        if amount < 0 {
            return Err(FieldError::new(field, format!("{field} must not be negative")));
        }
    }

    for (index, item) in input.items.iter().enumerate() {
        if item.qty < 1 {
            return Err(FieldError::new(
                format!("items[{index}].qty"),
                "qty must be a positive integer",
            ));
        }
        if item.price < 0 {
            return Err(FieldError::new(
                format!("items[{index}].price"),
                "price must not be negative",
            ));
        }
        if item.discount < 0 {
            return Err(FieldError::new(
                format!("items[{index}].discount"),
                "discount must not be negative",
            ));
        }
    }

    Ok(())
}

// ============================================================================
// Search Helpers
// ============================================================================

/// Escape `%`, `_` and `\` so the text matches literally inside `ILIKE`
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
