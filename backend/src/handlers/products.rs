//! HTTP handlers for product catalog endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::error::AppResult;
use crate::extract::{AppJson, AppQuery};
use crate::models::{NewProduct, Product};
use crate::services::CatalogService;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ProductSearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Search active products
pub async fn search_products(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ProductSearchQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let service = CatalogService::new(state.db);
    let products = service.search(&query.q).await?;
    Ok(Json(products))
}

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    AppJson(input): AppJson<NewProduct>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let service = CatalogService::new(state.db);
    let product = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}
