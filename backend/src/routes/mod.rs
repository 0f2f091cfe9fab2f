//! Route definitions for the POS backend

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/products", product_routes())
        .nest("/sales", sale_routes())
        .nest("/reports", report_routes())
}

/// Product catalog routes
fn product_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(handlers::search_products).post(handlers::create_product),
    )
}

/// Sale routes
fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_sale))
        .route("/:id", get(handlers::get_sale))
}

/// Report routes
fn report_routes() -> Router<AppState> {
    Router::new().route("/daily", get(handlers::get_daily_report))
}
