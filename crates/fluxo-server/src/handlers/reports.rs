//! Report handlers

use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    Json,
};
use serde::Deserialize;

use crate::{get_user_email, AppError, AppState};
use fluxo_core::db::FinancialSummary;

use super::transactions::parse_date_range;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    /// Start date (YYYY-MM-DD)
    pub from: Option<String>,
    /// End date (YYYY-MM-DD)
    pub to: Option<String>,
    /// Restrict to one segment
    pub segment_id: Option<i64>,
}

/// GET /api/reports/summary - Receivable/payable totals
pub async fn report_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SummaryQuery>,
    request: Request,
) -> Result<Json<FinancialSummary>, AppError> {
    let user_email = get_user_email(request.headers());

    let date_range = parse_date_range(params.from.as_deref(), params.to.as_deref())?;
    if let Some(segment_id) = params.segment_id {
        if state.db.get_segment(segment_id)?.is_none() {
            return Err(AppError::not_found("Segment not found"));
        }
    }

    let summary = state.db.financial_summary(date_range, params.segment_id)?;

    state.db.log_audit(
        &user_email,
        "report",
        Some("summary"),
        None,
        Some(&format!(
            "from={:?}, to={:?}, segment_id={:?}",
            params.from, params.to, params.segment_id
        )),
    )?;

    Ok(Json(summary))
}
