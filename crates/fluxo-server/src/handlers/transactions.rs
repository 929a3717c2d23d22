//! Transaction handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{get_user_email, AppError, AppState, MAX_PAGE_LIMIT};
use fluxo_core::db::TransactionFilter;
use fluxo_core::models::{Direction, DocumentStatus, ProviderKind, StoredTransaction};

/// Query parameters for listing transactions
#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    /// Filter by source provider (pluggy, belvo, statement)
    pub provider: Option<String>,
    /// Filter by segment ID
    pub segment_id: Option<i64>,
    /// Filter by direction (receivable or payable)
    pub direction: Option<String>,
    /// Search query (filters by description)
    pub search: Option<String>,
    /// Start date (YYYY-MM-DD)
    pub from: Option<String>,
    /// End date (YYYY-MM-DD)
    pub to: Option<String>,
}

fn default_limit() -> i64 {
    50
}

#[derive(Serialize)]
pub struct TransactionResponse {
    pub transactions: Vec<StoredTransaction>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Parse an optional YYYY-MM-DD pair into a date range
pub(crate) fn parse_date_range(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Option<(NaiveDate, NaiveDate)>, AppError> {
    match (from, to) {
        (Some(from), Some(to)) => {
            let from = from
                .parse::<NaiveDate>()
                .map_err(|_| AppError::bad_request("Invalid 'from' date, expected YYYY-MM-DD"))?;
            let to = to
                .parse::<NaiveDate>()
                .map_err(|_| AppError::bad_request("Invalid 'to' date, expected YYYY-MM-DD"))?;
            if from > to {
                return Err(AppError::bad_request("'from' date is after 'to' date"));
            }
            Ok(Some((from, to)))
        }
        (None, None) => Ok(None),
        _ => Err(AppError::bad_request(
            "Both 'from' and 'to' are required for a date range",
        )),
    }
}

fn build_filter(params: &TransactionQuery) -> Result<TransactionFilter, AppError> {
    let provider = params
        .provider
        .as_deref()
        .map(|p| {
            p.parse::<ProviderKind>()
                .map_err(|_| AppError::bad_request("Unknown provider, expected pluggy|belvo|statement"))
        })
        .transpose()?;
    let direction = params
        .direction
        .as_deref()
        .map(|d| {
            d.parse::<Direction>()
                .map_err(|_| AppError::bad_request("Unknown direction, expected receivable|payable"))
        })
        .transpose()?;
    let date_range = parse_date_range(params.from.as_deref(), params.to.as_deref())?;

    Ok(TransactionFilter {
        provider,
        segment_id: params.segment_id,
        direction,
        search: params.search.clone(),
        date_range,
    })
}

/// GET /api/transactions - List transactions
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TransactionQuery>,
    request: Request,
) -> Result<Json<TransactionResponse>, AppError> {
    let user_email = get_user_email(request.headers());

    // Input validation: clamp pagination parameters
    let limit = params.limit.max(1).min(MAX_PAGE_LIMIT);
    let offset = params.offset.max(0);

    let filter = build_filter(&params)?;
    let transactions = state.db.list_transactions(&filter, limit, offset)?;
    let total = state.db.count_transactions(&filter)?;

    // Audit log - read access
    state.db.log_audit(
        &user_email,
        "list",
        Some("transaction"),
        None,
        Some(&format!(
            "limit={}, offset={}, provider={:?}, segment_id={:?}, direction={:?}, search={:?}, returned={}",
            limit,
            offset,
            params.provider,
            params.segment_id,
            params.direction,
            params.search,
            transactions.len()
        )),
    )?;

    Ok(Json(TransactionResponse {
        transactions,
        total,
        limit,
        offset,
    }))
}

/// GET /api/transactions/:id - Get a single transaction
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<StoredTransaction>, AppError> {
    let user_email = get_user_email(request.headers());

    let transaction = state
        .db
        .get_transaction(id)?
        .ok_or_else(|| AppError::not_found("Transaction not found"))?;

    state
        .db
        .log_audit(&user_email, "get", Some("transaction"), Some(id), None)?;

    Ok(Json(transaction))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

/// PUT /api/transactions/:id/status - Update a transaction's business status
pub async fn update_transaction_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<StoredTransaction>, AppError> {
    let user_email = get_user_email(&headers);

    let status = body.status.parse::<DocumentStatus>().map_err(|_| {
        AppError::bad_request("Unknown status, expected pending|paid|overdue|cancelled")
    })?;

    if !state.db.set_transaction_status(id, status)? {
        return Err(AppError::not_found("Transaction not found"));
    }

    state.db.log_audit(
        &user_email,
        "update_status",
        Some("transaction"),
        Some(id),
        Some(&format!("status={}", status)),
    )?;

    let transaction = state
        .db
        .get_transaction(id)?
        .ok_or_else(|| AppError::not_found("Transaction not found"))?;
    Ok(Json(transaction))
}
