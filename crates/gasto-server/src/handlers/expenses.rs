//! Expense submission and query handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

use gasto_core::models::ExpenseWithCategory;

use crate::{AppError, AppState, MAX_PAGE_LIMIT};

#[derive(Deserialize)]
pub struct TextExpenseRequest {
    pub text: String,
}

/// POST /api/expenses/text - Create an expense from free-form text
pub async fn submit_text(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TextExpenseRequest>,
) -> Result<(StatusCode, Json<ExpenseWithCategory>), AppError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(AppError::bad_request("Field 'text' must not be empty"));
    }

    let item = state.processor.process_expense(Some(text), None, None).await?;

    info!(id = item.expense.id, amount = item.expense.amount, "Expense created from text");
    Ok((StatusCode::CREATED, Json(item)))
}

#[derive(Deserialize)]
pub struct UploadQuery {
    /// Original filename, used for format detection
    pub filename: Option<String>,
}

/// POST /api/expenses/image - Create an expense from raw image bytes
pub async fn submit_image(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<ExpenseWithCategory>), AppError> {
    if body.is_empty() {
        return Err(AppError::bad_request("Request body must not be empty"));
    }

    let document = state
        .documents
        .process_image_bytes(&body, params.filename.as_deref())?;
    let item = state.processor.process_document(&document).await?;

    info!(id = item.expense.id, amount = item.expense.amount, "Expense created from image");
    Ok((StatusCode::CREATED, Json(item)))
}

/// POST /api/expenses/document - Create an expense from raw PDF bytes
pub async fn submit_document(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<ExpenseWithCategory>), AppError> {
    if body.is_empty() {
        return Err(AppError::bad_request("Request body must not be empty"));
    }

    let document = state
        .documents
        .process_pdf_bytes(&body, params.filename.as_deref())?;
    let item = state.processor.process_document(&document).await?;

    info!(id = item.expense.id, amount = item.expense.amount, "Expense created from document");
    Ok((StatusCode::CREATED, Json(item)))
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchKind {
    Image,
    Document,
}

#[derive(Deserialize)]
pub struct FetchExpenseRequest {
    pub url: String,
    pub kind: FetchKind,
}

/// POST /api/expenses/fetch - Download a remote file and create an expense
pub async fn submit_fetch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FetchExpenseRequest>,
) -> Result<(StatusCode, Json<ExpenseWithCategory>), AppError> {
    let fetched = state.fetcher.fetch(&request.url).await?;
    // Temp files carry no extension, so hand the bytes over together with
    // the filename reported by the remote server
    let bytes = std::fs::read(fetched.path()).map_err(gasto_core::Error::from)?;

    let document = match request.kind {
        FetchKind::Image => state
            .documents
            .process_image_bytes(&bytes, fetched.file_name())?,
        FetchKind::Document => state
            .documents
            .process_pdf_bytes(&bytes, fetched.file_name())?,
    };
    let item = state.processor.process_document(&document).await?;

    info!(
        id = item.expense.id,
        url = %request.url,
        "Expense created from fetched file"
    );
    Ok((StatusCode::CREATED, Json(item)))
}

#[derive(Deserialize)]
pub struct ListExpensesQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// GET /api/expenses - List expenses, newest first
pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListExpensesQuery>,
) -> Result<Json<Vec<ExpenseWithCategory>>, AppError> {
    if params.limit < 1 || params.limit > MAX_PAGE_LIMIT {
        return Err(AppError::bad_request(&format!(
            "Limit must be between 1 and {}",
            MAX_PAGE_LIMIT
        )));
    }
    if params.offset < 0 {
        return Err(AppError::bad_request("Offset must not be negative"));
    }

    let expenses = state.db.list_expenses(params.limit, params.offset)?;
    Ok(Json(expenses))
}

/// GET /api/expenses/:id - Get a single expense
pub async fn get_expense(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ExpenseWithCategory>, AppError> {
    let item = state
        .db
        .get_expense(id)?
        .ok_or_else(|| AppError::not_found(&format!("Expense {} not found", id)))?;
    Ok(Json(item))
}
