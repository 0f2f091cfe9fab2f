//! Store integration tests
//!
//! Each test gets a fresh migrated database from `#[sqlx::test]`.
//! Run with `DATABASE_URL` set and `cargo test -- --ignored`.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use pos_backend::config::SalesConfig;
use pos_backend::error::AppError;
use pos_backend::services::{CatalogService, ReportingService, SaleService};
use pos_backend::Database;
use shared::{HourlyTotal, NewProduct, NewSale, NewSaleItem, Product, StockMoveReason};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

fn sales(db: &Database, allow_negative_stock: bool) -> SaleService {
    SaleService::new(db.clone(), &SalesConfig { allow_negative_stock })
}

async fn product(db: &Database, sku: &str, name: &str, price: i64, stock: i64) -> Product {
    CatalogService::new(db.clone())
        .create(NewProduct {
            sku: Some(sku.to_string()),
            name: Some(name.to_string()),
            price: Some(price),
            stock,
            ..NewProduct::default()
        })
        .await
        .unwrap()
}

fn new_sale(items: &[(i64, i64, i64)], pay_cash: i64, key: Option<&str>) -> NewSale {
    let items: Vec<NewSaleItem> = items
        .iter()
        .map(|&(product_id, qty, price)| NewSaleItem {
            product_id,
            qty,
            price,
            discount: 0,
        })
        .collect();
    serde_json::from_value(serde_json::json!({
        "items": items,
        "pay_cash": pay_cash,
        "idempotency_key": key,
    }))
    .unwrap()
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM pos.{table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn stock_of(pool: &PgPool, product_id: i64) -> i64 {
    sqlx::query_scalar("SELECT stock FROM pos.products WHERE id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Pool over the same test database that can hand out one connection only
async fn single_connection(pool: &PgPool) -> Database {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with((*pool.connect_options()).clone())
        .await
        .unwrap();
    Database::from_pool(pool)
}

async fn insert_sale_at(pool: &PgPool, datetime: DateTime<Utc>, total: i64) {
    sqlx::query(
        "INSERT INTO pos.sales (id, datetime, subtotal, total) VALUES ($1, $2, $3, $3)",
    )
    .bind(uuid::Uuid::new_v4())
    .bind(datetime)
    .bind(total)
    .execute(pool)
    .await
    .unwrap();
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_sale_commits_every_row(pool: PgPool) {
    let db = Database::from_pool(pool.clone());
    let kopi = product(&db, "KOPI-01", "Kopi Susu", 1200, 10).await;

    let receipt = sales(&db, true)
        .record_sale(new_sale(&[(kopi.id, 2, 1200)], 3000, None))
        .await
        .unwrap();

    assert_eq!(receipt.total, 2400);
    assert_eq!(receipt.change, 600);
    assert!(!receipt.replayed);
    assert_eq!(stock_of(&pool, kopi.id).await, 8);

    let detail = sales(&db, true).get_sale(receipt.id).await.unwrap();
    assert_eq!(detail.sale.subtotal, 2400);
    assert_eq!(detail.sale.cashier, "kasir");
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].name, "Kopi Susu");
    assert_eq!(detail.items[0].total, 2400);

    let moves = sales(&db, true).stock_moves(receipt.id).await.unwrap();
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0].qty_change, -2);
    assert_eq!(moves[0].reason, StockMoveReason::Sale);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_unknown_product_rolls_back_whole_sale(pool: PgPool) {
    let db = Database::from_pool(pool.clone());
    let kopi = product(&db, "KOPI-01", "Kopi Susu", 1200, 10).await;

    let err = sales(&db, true)
        .record_sale(new_sale(&[(kopi.id, 1, 1200), (999_999, 1, 500)], 0, None))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Transaction(_)));
    assert_eq!(count(&pool, "sales").await, 0);
    assert_eq!(count(&pool, "sale_items").await, 0);
    assert_eq!(count(&pool, "stock_moves").await, 0);
    assert_eq!(stock_of(&pool, kopi.id).await, 10);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_negative_stock_accepted_by_default(pool: PgPool) {
    let db = Database::from_pool(pool.clone());
    let teh = product(&db, "TEH-01", "Teh Manis", 800, 1).await;

    sales(&db, true)
        .record_sale(new_sale(&[(teh.id, 3, 800)], 2400, None))
        .await
        .unwrap();

    assert_eq!(stock_of(&pool, teh.id).await, -2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_stock_guard_rejects_oversell(pool: PgPool) {
    let db = Database::from_pool(pool.clone());
    let teh = product(&db, "TEH-01", "Teh Manis", 800, 1).await;

    let err = sales(&db, false)
        .record_sale(new_sale(&[(teh.id, 3, 800)], 2400, None))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InsufficientStock(_)));
    assert_eq!(count(&pool, "sales").await, 0);
    assert_eq!(stock_of(&pool, teh.id).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_idempotency_key_replays_receipt(pool: PgPool) {
    let db = Database::from_pool(pool.clone());
    let kopi = product(&db, "KOPI-01", "Kopi Susu", 1200, 10).await;
    let service = sales(&db, true);

    let first = service
        .record_sale(new_sale(&[(kopi.id, 2, 1200)], 3000, Some("till-1-0001")))
        .await
        .unwrap();
    let second = service
        .record_sale(new_sale(&[(kopi.id, 2, 1200)], 3000, Some("till-1-0001")))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert!(second.replayed);
    assert_eq!(count(&pool, "sales").await, 1);
    assert_eq!(stock_of(&pool, kopi.id).await, 8);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_search_and_duplicate_sku(pool: PgPool) {
    let db = Database::from_pool(pool.clone());
    product(&db, "KOPI-01", "Kopi Susu", 1200, 10).await;
    product(&db, "TEH-01", "Teh Manis", 800, 5).await;
    let catalog = CatalogService::new(db.clone());

    let found = catalog.search("kopi").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].sku.as_deref(), Some("KOPI-01"));

    let by_sku = catalog.search("teh-0").await.unwrap();
    assert_eq!(by_sku[0].name, "Teh Manis");

    let all = catalog.search("").await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].name, "Kopi Susu");

    // LIKE wildcards match literally
    assert!(catalog.search("%").await.unwrap().is_empty());

    let err = catalog
        .create(NewProduct {
            sku: Some("KOPI-01".to_string()),
            name: Some("Kopi Hitam".to_string()),
            price: Some(1000),
            ..NewProduct::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateEntry(ref field) if field == "sku"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_missing_sale_not_found(pool: PgPool) {
    let db = Database::from_pool(pool);
    let err = sales(&db, true).get_sale(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_daily_totals_group_by_hour(pool: PgPool) {
    let db = Database::from_pool(pool.clone());
    let kopi = product(&db, "KOPI-01", "Kopi Susu", 1200, 100).await;
    let service = sales(&db, true);

    for _ in 0..3 {
        service
            .record_sale(new_sale(&[(kopi.id, 1, 1200)], 1200, None))
            .await
            .unwrap();
    }

    let report = ReportingService::new(db.clone());
    let today = report.daily_totals(None).await.unwrap();
    assert!(!today.is_empty());
    assert_eq!(today.iter().map(|h| h.total).sum::<i64>(), 3600);
    assert!(today.iter().all(|h| h.hour <= Utc::now()));

    let yesterday = (Utc::now() - chrono::Duration::days(1)).date_naive();
    assert!(report.daily_totals(Some(yesterday)).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_dropped_unit_of_work_rolls_back(pool: PgPool) {
    let db = single_connection(&pool).await;
    let kopi = product(&db, "KOPI-01", "Kopi Susu", 1200, 10).await;

    {
        let mut uow = db.begin().await.unwrap();
        sqlx::query("UPDATE pos.products SET stock = 0 WHERE id = $1")
            .bind(kopi.id)
            .execute(uow.conn())
            .await
            .unwrap();
        // dropped without commit
    }

    // The only connection is back in the pool with the update undone
    let stock: i64 = sqlx::query_scalar("SELECT stock FROM pos.products WHERE id = $1")
        .bind(kopi.id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(stock, 10);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_cancelled_unit_of_work_rolls_back(pool: PgPool) {
    let db = single_connection(&pool).await;
    let kopi = product(&db, "KOPI-01", "Kopi Susu", 1200, 10).await;

    let (written_tx, written_rx) = tokio::sync::oneshot::channel();
    let task_db = db.clone();
    let task = tokio::spawn(async move {
        let mut uow = task_db.begin().await.unwrap();
        sqlx::query("UPDATE pos.products SET stock = 0 WHERE id = $1")
            .bind(kopi.id)
            .execute(uow.conn())
            .await
            .unwrap();
        let _ = written_tx.send(());
        std::future::pending::<()>().await;
        uow.commit().await.unwrap();
    });

    written_rx.await.unwrap();
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    let mut uow = db.begin().await.unwrap();
    let stock: i64 = sqlx::query_scalar("SELECT stock FROM pos.products WHERE id = $1")
        .bind(kopi.id)
        .fetch_one(uow.conn())
        .await
        .unwrap();
    uow.commit().await.unwrap();
    assert_eq!(stock, 10);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_daily_totals_hour_boundaries(pool: PgPool) {
    let at = |y: i32, mo: u32, d: u32, h: u32, mi: u32, se: u32| {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, se).unwrap()
    };

    insert_sale_at(&pool, at(2024, 2, 29, 23, 59, 59), 1).await;
    insert_sale_at(&pool, at(2024, 3, 1, 0, 0, 0), 10).await;
    insert_sale_at(&pool, at(2024, 3, 1, 0, 30, 0), 20).await;
    insert_sale_at(&pool, at(2024, 3, 1, 13, 5, 0), 300).await;
    insert_sale_at(&pool, at(2024, 3, 2, 0, 0, 0), 1000).await;

    let report = ReportingService::new(Database::from_pool(pool))
        .daily_totals(NaiveDate::from_ymd_opt(2024, 3, 1))
        .await
        .unwrap();

    assert_eq!(
        report,
        vec![
            HourlyTotal {
                hour: at(2024, 3, 1, 0, 0, 0),
                total: 30,
            },
            HourlyTotal {
                hour: at(2024, 3, 1, 13, 0, 0),
                total: 300,
            },
        ]
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_sales_never_oversell(pool: PgPool) {
    let db = Database::from_pool(pool.clone());
    let teh = product(&db, "TEH-01", "Teh Manis", 800, 10).await;
    let service = sales(&db, false);

    let tasks: Vec<_> = (0..15)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .record_sale(new_sale(&[(teh.id, 1, 800)], 800, None))
                    .await
            })
        })
        .collect();

    let mut sold = HashSet::new();
    let mut rejected = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(receipt) => {
                sold.insert(receipt.id);
            }
            Err(AppError::InsufficientStock(_)) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(sold.len(), 10);
    assert_eq!(rejected, 5);
    assert_eq!(stock_of(&pool, teh.id).await, 0);
    assert_eq!(count(&pool, "sales").await, 10);
    assert_eq!(count(&pool, "stock_moves").await, 10);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_replays_record_one_sale(pool: PgPool) {
    let db = Database::from_pool(pool.clone());
    let kopi = product(&db, "KOPI-01", "Kopi Susu", 1200, 10).await;
    let service = sales(&db, true);

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .record_sale(new_sale(&[(kopi.id, 1, 1200)], 1200, Some("till-2-0042")))
                    .await
            })
        })
        .collect();

    let mut ids = HashSet::new();
    let mut replayed = 0;
    for task in tasks {
        let receipt = task.await.unwrap().unwrap();
        ids.insert(receipt.id);
        if receipt.replayed {
            replayed += 1;
        }
    }

    assert_eq!(ids.len(), 1);
    assert_eq!(replayed, 7);
    assert_eq!(count(&pool, "sales").await, 1);
    assert_eq!(stock_of(&pool, kopi.id).await, 9);
}
