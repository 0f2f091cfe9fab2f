//! Reporting handlers

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extract::AppQuery;
use crate::services::ReportingService;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DailyReportQuery {
    /// Calendar day as YYYY-MM-DD; empty or absent means today
    pub day: Option<String>,
    pub format: Option<String>, // "json" or "csv"
}

impl DailyReportQuery {
    pub fn parse_day(&self) -> AppResult<Option<NaiveDate>> {
        match self.day.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(day) => NaiveDate::parse_from_str(day, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| AppError::Validation {
                    field: "day".to_string(),
                    message: "day must be a date in YYYY-MM-DD format".to_string(),
                }),
        }
    }
}

/// Get sale totals per hour for one day
pub async fn get_daily_report(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<DailyReportQuery>,
) -> AppResult<Response> {
    let day = query.parse_day()?;

    let service = ReportingService::new(state.db);
    let data = service.daily_totals(day).await?;

    if query.format.as_deref() == Some("csv") {
        let csv = ReportingService::export_to_csv(&data)?;
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"daily_totals.csv\""),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(data).into_response())
    }
}
