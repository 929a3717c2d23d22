//! Health check handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{AppError, AppState};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
}

/// GET /api/health - Service health
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, AppError> {
    // A trivial query proves the pool can hand out working connections
    let database = state.db.list_segments().is_ok();

    Ok(Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
    }))
}
