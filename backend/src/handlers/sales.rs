//! HTTP handlers for sale endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::models::{NewSale, SaleDetail, SaleReceipt};
use crate::services::SaleService;
use crate::AppState;

/// Record a sale
pub async fn create_sale(
    State(state): State<AppState>,
    AppJson(input): AppJson<NewSale>,
) -> AppResult<(StatusCode, Json<SaleReceipt>)> {
    let service = SaleService::new(state.db, &state.config.sales);
    let receipt = service.record_sale(input).await?;

    // A replayed idempotency key created nothing
    let status = if receipt.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(receipt)))
}

/// Get a sale with its items
pub async fn get_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<String>,
) -> AppResult<Json<SaleDetail>> {
    // Sale ids are UUIDs; anything else cannot exist
    let sale_id =
        Uuid::parse_str(&sale_id).map_err(|_| AppError::NotFound("Sale".to_string()))?;

    let service = SaleService::new(state.db, &state.config.sales);
    let detail = service.get_sale(sale_id).await?;
    Ok(Json(detail))
}
