//! Reporting and export handlers

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use chrono::{Datelike, Local, NaiveDate};
use serde::Deserialize;
use tracing::info;

use gasto_core::export::ExpenseExportOptions;
use gasto_core::models::MonthlyReport;

use crate::{AppError, AppState};

#[derive(Deserialize)]
pub struct MonthlyReportQuery {
    /// Report year (defaults to the current year)
    pub year: Option<i32>,
    /// Report month 1-12 (defaults to the current month)
    pub month: Option<u32>,
}

/// GET /api/reports/monthly - Per-category totals for one month
pub async fn monthly_report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MonthlyReportQuery>,
) -> Result<Json<MonthlyReport>, AppError> {
    // Expenses are dated with the local calendar date, so the default
    // reporting month follows the same clock
    let today = Local::now().date_naive();
    let year = params.year.unwrap_or(today.year());
    let month = params.month.unwrap_or(today.month());

    if !(1..=12).contains(&month) {
        return Err(AppError::bad_request("Month must be between 1 and 12"));
    }

    let report = state
        .db
        .monthly_report(year, month, state.processor.base_currency())?;
    Ok(Json(report))
}

#[derive(Deserialize)]
pub struct ExportQuery {
    /// Earliest date to include (YYYY-MM-DD)
    pub from: Option<String>,
    /// Latest date to include (YYYY-MM-DD)
    pub to: Option<String>,
}

/// GET /api/export/expenses - Export expenses as a CSV download
pub async fn export_expenses(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let from = params
        .from
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .map_err(|_| AppError::bad_request("Invalid 'from' date, expected YYYY-MM-DD"))?;
    let to = params
        .to
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .map_err(|_| AppError::bad_request("Invalid 'to' date, expected YYYY-MM-DD"))?;

    let csv = state
        .db
        .export_expenses_csv(&ExpenseExportOptions { from, to })?;

    let rows = csv.lines().count().saturating_sub(1);
    info!("Exported {} expenses to CSV", rows);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"expenses.csv\"",
        )
        .body(Body::from(csv))
        .map_err(|e| AppError::internal(&format!("Failed to build response: {}", e)))
}
