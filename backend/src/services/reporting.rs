//! Reporting service for the daily sales aggregate and its CSV export

use chrono::NaiveDate;
use serde::Serialize;
use shared::{DayWindow, HourlyTotal};

use crate::db::Database;
use crate::error::{AppError, AppResult};

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: Database,
}

impl ReportingService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Sale totals per UTC hour for one calendar day (today when `day` is `None`)
    pub async fn daily_totals(&self, day: Option<NaiveDate>) -> AppResult<Vec<HourlyTotal>> {
        let window = day.map(DayWindow::for_day).unwrap_or_else(DayWindow::today);

        let totals = sqlx::query_as::<_, HourlyTotal>(
            r#"
            SELECT date_trunc('hour', datetime AT TIME ZONE 'UTC') AT TIME ZONE 'UTC' AS hour,
                   SUM(total)::BIGINT AS total
            FROM pos.sales
            WHERE datetime >= $1 AND datetime < $2
            GROUP BY 1
            ORDER BY 1 ASC
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_all(self.db.pool())
        .await?;

        Ok(totals)
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}
