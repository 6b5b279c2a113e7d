//! Notification endpoints.
//!
//! Read state lives on the client. The server hands out the raw feed and,
//! statelessly, the feed reconciled against a read set the client sends.
//!
//! - `GET /api/notifications?actor=` - raw feed, most recent first
//! - `POST /api/notifications/reconcile` - feed merged with the client's read keys

use super::error::AppError;
use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
};
use eventgate_core::notifications::{NotificationView, ReadKeys};
use eventgate_core::types::{ActorId, NotificationRecord};
use serde::Deserialize;

/// Query for the raw feed.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// Whose feed
    pub actor: ActorId,
}

/// Body for reconciliation.
#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    /// Whose feed
    pub actor: ActorId,
    /// Keys the client has already marked read
    #[serde(default)]
    pub read_keys: ReadKeys,
}

/// Raw feed.
///
/// # Errors
///
/// 503 when the store is unavailable.
pub async fn feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<NotificationRecord>>, AppError> {
    Ok(Json(state.service.notifications(query.actor).await?))
}

/// Reconciled view.
///
/// # Errors
///
/// 503 when the store is unavailable.
pub async fn reconcile(
    State(state): State<AppState>,
    Json(request): Json<ReconcileRequest>,
) -> Result<Json<NotificationView>, AppError> {
    let view = state
        .service
        .reconcile_notifications(request.actor, &request.read_keys)
        .await?;
    Ok(Json(view))
}
