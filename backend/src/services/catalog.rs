//! Catalog service for product search and creation

use shared::{escape_like, validate_new_product, NewProduct, Product};
use tracing::info;

use crate::db::{Database, DbError};
use crate::error::{AppError, AppResult};

/// Maximum number of products a search returns
pub const SEARCH_LIMIT: i64 = 200;

/// Catalog service for managing products
#[derive(Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    /// Create a new CatalogService instance
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Search active products by name, SKU or barcode (case-insensitive substring).
    /// An empty query lists active products.
    pub async fn search(&self, query: &str) -> AppResult<Vec<Product>> {
        let query = query.trim();
        let pattern = format!("%{}%", escape_like(query));

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, barcode, name, price, stock, unit, is_active, created_at
            FROM pos.products
            WHERE is_active = TRUE
              AND ($1 = '' OR name ILIKE $2 OR sku ILIKE $2 OR barcode ILIKE $2)
            ORDER BY name ASC
            LIMIT $3
            "#,
        )
        .bind(query)
        .bind(&pattern)
        .bind(SEARCH_LIMIT)
        .fetch_all(self.db.pool())
        .await?;

        Ok(products)
    }

    /// Create a product
    pub async fn create(&self, input: NewProduct) -> AppResult<Product> {
        validate_new_product(&input)?;

        let name = input.name.as_deref().map(str::trim);

        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO pos.products (sku, barcode, name, price, stock, unit)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, sku, barcode, name, price, stock, unit, is_active, created_at
            "#,
        )
        .bind(&input.sku)
        .bind(&input.barcode)
        .bind(name)
        .bind(input.price)
        .bind(input.stock)
        .bind(input.unit_or_default())
        .fetch_one(self.db.pool())
        .await
        .map_err(|e| {
            let err = DbError::from(e);
            if err.is_unique_violation() {
                let field = match err.constraint() {
                    Some(c) if c.contains("barcode") => "barcode",
                    _ => "sku",
                };
                AppError::DuplicateEntry(field.to_string())
            } else {
                AppError::Database(err)
            }
        })?;

        info!(product_id = product.id, name = %product.name, "Product created");

        Ok(product)
    }
}
