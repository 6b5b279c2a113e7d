//! Analytics endpoint.
//!
//! `GET /api/analytics?start=YYYY-MM-DD&end=YYYY-MM-DD` returns the
//! pre-aggregated report. Both bounds are optional and inclusive; `end` covers
//! the whole day.

use super::error::AppError;
use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
};
use eventgate_core::analytics::{AnalyticsReport, DateRange};

/// Build the report.
///
/// # Errors
///
/// 422 when `start` is after `end`.
pub async fn get_analytics(
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> Result<Json<AnalyticsReport>, AppError> {
    Ok(Json(state.service.analytics(range).await?))
}
