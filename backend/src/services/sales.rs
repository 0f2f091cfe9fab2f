//! Sale transaction service
//!
//! Records a sale header, its lines, the matching stock ledger entries and
//! the stock decrements as one unit of work. Either every row of a sale is
//! committed or none is.

use chrono::Utc;
use shared::{
    validate_new_sale, NewSale, NewSaleItem, Sale, SaleDetail, SaleItemDetail, SaleReceipt,
    SaleTotals, StockMove, StockMoveReason,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SalesConfig;
use crate::db::{Database, DbError, UnitOfWork};
use crate::error::{AppError, AppResult};

/// Sale service for recording and reading sales
#[derive(Clone)]
pub struct SaleService {
    db: Database,
    allow_negative_stock: bool,
}

/// What the header insert found
enum WriteOutcome {
    Created,
    /// A sale with the same idempotency key already exists
    Replayed(SaleReceipt),
}

fn tx_err(err: sqlx::Error) -> AppError {
    AppError::Transaction(DbError::from(err))
}

impl SaleService {
    /// Create a new SaleService instance
    pub fn new(db: Database, config: &SalesConfig) -> Self {
        Self {
            db,
            allow_negative_stock: config.allow_negative_stock,
        }
    }

    /// Record a sale atomically
    pub async fn record_sale(&self, input: NewSale) -> AppResult<SaleReceipt> {
        validate_new_sale(&input)?;
        let totals = SaleTotals::compute(&input.items, input.discount, input.payments())?;

        let sale_id = Uuid::new_v4();
        let mut uow = self.db.begin().await.map_err(AppError::Transaction)?;

        match self.write_sale(&mut uow, sale_id, &input, &totals).await {
            Ok(WriteOutcome::Created) => {
                uow.commit().await.map_err(AppError::Transaction)?;
                info!(
                    %sale_id,
                    cashier = %input.cashier,
                    items = input.items.len(),
                    total = totals.total,
                    "Sale recorded"
                );
                Ok(SaleReceipt {
                    id: sale_id,
                    total: totals.total,
                    change: totals.change,
                    replayed: false,
                })
            }
            Ok(WriteOutcome::Replayed(receipt)) => {
                discard(uow).await;
                info!(sale_id = %receipt.id, "Sale replayed for idempotency key");
                Ok(receipt)
            }
            Err(err) => {
                discard(uow).await;
                warn!(%sale_id, error = %err, "Sale rolled back");
                Err(err)
            }
        }
    }

    async fn write_sale(
        &self,
        uow: &mut UnitOfWork,
        sale_id: Uuid,
        input: &NewSale,
        totals: &SaleTotals,
    ) -> AppResult<WriteOutcome> {
        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO pos.sales (
                id, datetime, cashier, subtotal, discount, tax, total,
                pay_cash, pay_edc, pay_qr, "change", note, idempotency_key
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (idempotency_key) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(sale_id)
        .bind(Utc::now())
        .bind(&input.cashier)
        .bind(totals.subtotal)
        .bind(totals.discount)
        .bind(totals.tax)
        .bind(totals.total)
        .bind(input.pay_cash)
        .bind(input.pay_edc)
        .bind(input.pay_qr)
        .bind(totals.change)
        .bind(&input.note)
        .bind(&input.idempotency_key)
        .fetch_optional(uow.conn())
        .await
        .map_err(tx_err)?;

        if inserted.is_none() {
            let (id, total, change) = sqlx::query_as::<_, (Uuid, i64, i64)>(
                r#"SELECT id, total, "change" FROM pos.sales WHERE idempotency_key = $1"#,
            )
            .bind(&input.idempotency_key)
            .fetch_one(uow.conn())
            .await
            .map_err(tx_err)?;

            return Ok(WriteOutcome::Replayed(SaleReceipt {
                id,
                total,
                change,
                replayed: true,
            }));
        }

        let sale_ref = sale_id.to_string();
        for item in &input.items {
            self.write_line(uow, sale_id, &sale_ref, item).await?;
        }

        Ok(WriteOutcome::Created)
    }

    /// Sale line, ledger entry and stock decrement for one item
    async fn write_line(
        &self,
        uow: &mut UnitOfWork,
        sale_id: Uuid,
        sale_ref: &str,
        item: &NewSaleItem,
    ) -> AppResult<()> {
        let line_total = item.line_total().ok_or_else(|| {
            AppError::ValidationError(format!("amount overflow for product {}", item.product_id))
        })?;

        sqlx::query(
            r#"
            INSERT INTO pos.sale_items (sale_id, product_id, qty, price, discount, total)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(sale_id)
        .bind(item.product_id)
        .bind(item.qty)
        .bind(item.price)
        .bind(item.discount)
        .bind(line_total)
        .execute(uow.conn())
        .await
        .map_err(tx_err)?;

        sqlx::query(
            r#"
            INSERT INTO pos.stock_moves (product_id, qty_change, reason, "ref")
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(item.product_id)
        .bind(-item.qty)
        .bind(StockMoveReason::Sale.as_str())
        .bind(sale_ref)
        .execute(uow.conn())
        .await
        .map_err(tx_err)?;

        let decrement = if self.allow_negative_stock {
            sqlx::query("UPDATE pos.products SET stock = COALESCE(stock, 0) - $1 WHERE id = $2")
        } else {
            sqlx::query("UPDATE pos.products SET stock = stock - $1 WHERE id = $2 AND stock >= $1")
        };

        let updated = decrement
            .bind(item.qty)
            .bind(item.product_id)
            .execute(uow.conn())
            .await
            .map_err(tx_err)?;

        if updated.rows_affected() == 0 {
            return Err(if self.allow_negative_stock {
                AppError::Transaction(DbError::Statement(sqlx::Error::RowNotFound))
            } else {
                AppError::InsufficientStock(format!(
                    "product {} has less than {} in stock",
                    item.product_id, item.qty
                ))
            });
        }

        debug!(%sale_id, product_id = item.product_id, qty = item.qty, "Sale line written");
        Ok(())
    }

    /// Get a sale with its lines
    pub async fn get_sale(&self, sale_id: Uuid) -> AppResult<SaleDetail> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, datetime, cashier, subtotal, discount, tax, total,
                   pay_cash, pay_edc, pay_qr, "change", note, idempotency_key
            FROM pos.sales
            WHERE id = $1
            "#,
        )
        .bind(sale_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        let items = sqlx::query_as::<_, SaleItemDetail>(
            r#"
            SELECT si.id, si.sale_id, si.product_id, si.qty, si.price, si.discount, si.total,
                   p.name
            FROM pos.sale_items si
            JOIN pos.products p ON p.id = si.product_id
            WHERE si.sale_id = $1
            ORDER BY si.id
            "#,
        )
        .bind(sale_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(SaleDetail { sale, items })
    }

    /// Stock ledger entries written by a sale
    pub async fn stock_moves(&self, sale_id: Uuid) -> AppResult<Vec<StockMove>> {
        let moves = sqlx::query_as::<_, StockMove>(
            r#"
            SELECT id, product_id, qty_change, reason, "ref", created_at
            FROM pos.stock_moves
            WHERE "ref" = $1
            ORDER BY id
            "#,
        )
        .bind(sale_id.to_string())
        .fetch_all(self.db.pool())
        .await?;

        Ok(moves)
    }
}

/// Roll back a unit whose writes must not be kept
async fn discard(uow: UnitOfWork) {
    if let Err(err) = uow.rollback().await {
        // The connection is closed rather than returned when rollback fails
        warn!(error = %err, "Rollback failed");
    }
}
