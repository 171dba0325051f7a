//! Health check handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Model identifier of the configured AI provider
    pub provider: String,
    pub base_currency: String,
}

/// GET /api/health - Service health and configured provider
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        provider: state.processor.model().to_string(),
        base_currency: state.processor.base_currency().to_string(),
    })
}
