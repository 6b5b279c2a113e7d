//! Review endpoints.
//!
//! - `GET /api/events/:id/reviews`
//! - `POST /api/events/:id/reviews` - submit the caller's review
//! - `PUT /api/events/:id/reviews` - edit it
//! - `DELETE /api/events/:id/reviews` - delete it

use super::actor::ActorHeader;
use super::error::AppError;
use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use eventgate_core::reviews::ReviewInput;
use eventgate_core::types::{EventId, Review};

/// List reviews for an event.
///
/// # Errors
///
/// 404 for an unknown event.
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<Json<Vec<Review>>, AppError> {
    Ok(Json(state.service.list_reviews(id).await?))
}

/// Submit a review.
///
/// # Errors
///
/// 403 before completion or without a registration, 409 when already reviewed,
/// 422 for a bad rating or comment.
pub async fn submit_review(
    State(state): State<AppState>,
    actor: ActorHeader,
    Path(id): Path<EventId>,
    Json(input): Json<ReviewInput>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    let review = state.service.submit_review(id, actor.id(), input).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// Edit the caller's review.
///
/// # Errors
///
/// 404 without an existing review.
pub async fn update_review(
    State(state): State<AppState>,
    actor: ActorHeader,
    Path(id): Path<EventId>,
    Json(input): Json<ReviewInput>,
) -> Result<Json<Review>, AppError> {
    Ok(Json(state.service.update_review(id, actor.id(), input).await?))
}

/// Delete the caller's review.
///
/// # Errors
///
/// 404 without an existing review.
pub async fn delete_review(
    State(state): State<AppState>,
    actor: ActorHeader,
    Path(id): Path<EventId>,
) -> Result<StatusCode, AppError> {
    state.service.delete_review(id, actor.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}
