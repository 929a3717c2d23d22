//! Segment handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{get_user_email, AppError, AppState, SuccessResponse};
use fluxo_core::models::Segment;

#[derive(Debug, Deserialize)]
pub struct SegmentRequest {
    pub name: String,
    pub description: Option<String>,
}

/// GET /api/segments - List all segments
pub async fn list_segments(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<Segment>>, AppError> {
    let user_email = get_user_email(request.headers());

    let segments = state.db.list_segments()?;

    state
        .db
        .log_audit(&user_email, "list", Some("segment"), None, None)?;

    Ok(Json(segments))
}

/// GET /api/segments/:id - Get a single segment
pub async fn get_segment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Segment>, AppError> {
    let user_email = get_user_email(request.headers());

    let segment = state
        .db
        .get_segment(id)?
        .ok_or_else(|| AppError::not_found("Segment not found"))?;

    state
        .db
        .log_audit(&user_email, "get", Some("segment"), Some(id), None)?;

    Ok(Json(segment))
}

/// POST /api/segments - Create a segment
pub async fn create_segment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SegmentRequest>,
) -> Result<Json<Segment>, AppError> {
    let user_email = get_user_email(&headers);

    if body.name.trim().is_empty() {
        return Err(AppError::bad_request("Segment name is required"));
    }

    let segment = state
        .db
        .create_segment(body.name.trim(), body.description.as_deref())
        .map_err(|e| match e {
            fluxo_core::Error::Database(ref db_err)
                if db_err.to_string().contains("UNIQUE") =>
            {
                AppError::conflict("A segment with this name already exists")
            }
            fluxo_core::Error::InvalidData(msg) => AppError::bad_request(&msg),
            other => AppError::from(other),
        })?;

    state.db.log_audit(
        &user_email,
        "create",
        Some("segment"),
        Some(segment.id),
        Some(&format!("name={}", segment.name)),
    )?;

    Ok(Json(segment))
}

/// PUT /api/segments/:id - Update a segment
pub async fn update_segment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<SegmentRequest>,
) -> Result<Json<Segment>, AppError> {
    let user_email = get_user_email(&headers);

    if body.name.trim().is_empty() {
        return Err(AppError::bad_request("Segment name is required"));
    }

    let updated = state
        .db
        .update_segment(id, body.name.trim(), body.description.as_deref())
        .map_err(|e| match e {
            fluxo_core::Error::Database(ref db_err)
                if db_err.to_string().contains("UNIQUE") =>
            {
                AppError::conflict("A segment with this name already exists")
            }
            fluxo_core::Error::InvalidData(msg) => AppError::bad_request(&msg),
            other => AppError::from(other),
        })?;
    if !updated {
        return Err(AppError::not_found("Segment not found"));
    }

    state.db.log_audit(
        &user_email,
        "update",
        Some("segment"),
        Some(id),
        Some(&format!("name={}", body.name.trim())),
    )?;

    let segment = state
        .db
        .get_segment(id)?
        .ok_or_else(|| AppError::not_found("Segment not found"))?;
    Ok(Json(segment))
}

/// DELETE /api/segments/:id - Delete a segment
///
/// Its transactions and sync runs become global.
pub async fn delete_segment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_email = get_user_email(request.headers());

    if !state.db.delete_segment(id)? {
        return Err(AppError::not_found("Segment not found"));
    }

    state
        .db
        .log_audit(&user_email, "delete", Some("segment"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}
