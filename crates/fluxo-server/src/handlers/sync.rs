//! Sync and statement import handlers

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Path, Query, Request, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{get_user_email, AppError, AppState, MAX_PAGE_LIMIT, MAX_UPLOAD_SIZE};
use fluxo_core::models::{ProviderKind, StatementFormat, SyncOutcome, SyncRun};
use fluxo_core::providers::{FetchScope, ProviderClient};
use fluxo_core::sync::SyncEngine;

use super::transactions::parse_date_range;

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    /// Pluggy account id or Belvo link id
    pub scope: String,
    /// Start date (YYYY-MM-DD)
    pub from: Option<String>,
    /// End date (YYYY-MM-DD)
    pub to: Option<String>,
    /// Segment to attach fetched transactions to
    pub segment_id: Option<i64>,
}

/// POST /api/sync/:provider - Fetch and persist transactions from a provider
pub async fn run_sync(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    Json(body): Json<SyncRequest>,
) -> Result<Json<SyncOutcome>, AppError> {
    let user_email = get_user_email(&headers);

    let kind = provider
        .parse::<ProviderKind>()
        .map_err(|_| AppError::bad_request("Unknown provider, expected pluggy|belvo"))?;
    if kind == ProviderKind::Statement {
        return Err(AppError::bad_request(
            "Statement files are imported via POST /api/import/statement",
        ));
    }
    if body.scope.trim().is_empty() {
        return Err(AppError::bad_request("Scope (account/link id) is required"));
    }
    if let Some(segment_id) = body.segment_id {
        if state.db.get_segment(segment_id)?.is_none() {
            return Err(AppError::not_found("Segment not found"));
        }
    }

    let range = parse_date_range(body.from.as_deref(), body.to.as_deref())?;
    let (from, to) = match range {
        Some((from, to)) => (Some(from), Some(to)),
        None => (None, None),
    };
    let scope = FetchScope::new(body.scope.trim()).with_range(from, to);

    let client = ProviderClient::from_env(kind)
        .map_err(|e| AppError::internal(&e.to_string()))?;

    let engine = SyncEngine::new(state.db.clone());
    let outcome = engine.sync(&client, &scope, body.segment_id).await?;

    state.db.log_audit(
        &user_email,
        "sync",
        Some(kind.as_str()),
        None,
        Some(&format!(
            "scope={}, total={}, imported={}, updated={}, skipped={}",
            scope.scope, outcome.total, outcome.imported, outcome.updated, outcome.skipped
        )),
    )?;

    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    /// Statement format (csv, ofx, qif); auto-detected when omitted
    pub format: Option<String>,
    /// Segment to attach imported transactions to
    pub segment_id: Option<i64>,
    /// Label for the sync run (typically the file name)
    pub name: Option<String>,
}

/// POST /api/import/statement - Import a bank statement file
///
/// The request body is the raw statement content.
pub async fn import_statement(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ImportQuery>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<SyncOutcome>, AppError> {
    let user_email = get_user_email(&headers);

    // Read the raw body ourselves: the default extractor limit is smaller
    // than the statement cap
    let bytes = to_bytes(body, MAX_UPLOAD_SIZE)
        .await
        .map_err(|_| AppError::bad_request("Statement exceeds the size limit"))?;
    let content = String::from_utf8(bytes.to_vec())
        .map_err(|_| AppError::bad_request("Statement is not valid UTF-8"))?;

    if content.trim().is_empty() {
        return Err(AppError::bad_request("Statement content is empty"));
    }
    let format = params
        .format
        .as_deref()
        .map(|f| {
            f.parse::<StatementFormat>()
                .map_err(|_| AppError::bad_request("Unknown format, expected csv|ofx|qif"))
        })
        .transpose()?;
    if let Some(segment_id) = params.segment_id {
        if state.db.get_segment(segment_id)?.is_none() {
            return Err(AppError::not_found("Segment not found"));
        }
    }

    let scope = params.name.as_deref().unwrap_or("statement");
    let engine = SyncEngine::new(state.db.clone());
    let outcome = engine
        .import_statement(&content, format, scope, params.segment_id)
        .map_err(|e| match e {
            fluxo_core::Error::UnsupportedFormat(msg) => AppError::bad_request(&msg),
            fluxo_core::Error::Import(msg) => AppError::bad_request(&msg),
            other => AppError::from(other),
        })?;

    state.db.log_audit(
        &user_email,
        "import_statement",
        Some("statement"),
        None,
        Some(&format!(
            "name={}, total={}, imported={}, updated={}, skipped={}",
            scope, outcome.total, outcome.imported, outcome.updated, outcome.skipped
        )),
    )?;

    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct SyncHistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Serialize)]
pub struct SyncHistoryResponse {
    pub syncs: Vec<SyncRun>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// GET /api/syncs - List sync run history
pub async fn list_syncs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SyncHistoryQuery>,
    request: Request,
) -> Result<Json<SyncHistoryResponse>, AppError> {
    let user_email = get_user_email(request.headers());

    let limit = params.limit.max(1).min(MAX_PAGE_LIMIT);
    let offset = params.offset.max(0);

    let syncs = state.db.list_sync_runs(limit, offset)?;
    let total = state.db.count_sync_runs()?;

    state.db.log_audit(
        &user_email,
        "list",
        Some("sync_run"),
        None,
        Some(&format!(
            "limit={}, offset={}, returned={}",
            limit,
            offset,
            syncs.len()
        )),
    )?;

    Ok(Json(SyncHistoryResponse {
        syncs,
        total,
        limit,
        offset,
    }))
}
