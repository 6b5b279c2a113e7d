//! Registration, attendance and completion endpoints.
//!
//! - `POST /api/events/:id/register` - reserve a place for the caller
//! - `POST /api/events/:id/cancel` - cancel the caller's registration
//! - `PUT /api/events/:id/registrations/:actor_id/attendance` - organizer only
//! - `POST /api/events/:id/complete` - organizer only, idempotent

use super::actor::ActorHeader;
use super::error::AppError;
use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use eventgate_core::attendance::CompletionTransition;
use eventgate_core::types::{ActorId, EventId, Registration};
use serde::{Deserialize, Serialize};

/// Body for the attendance endpoint.
#[derive(Debug, Deserialize)]
pub struct AttendanceRequest {
    /// Whether the actor showed up
    pub attended: bool,
}

/// Response for the completion endpoint.
#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    /// Completed event
    pub event_id: EventId,
    /// Whether this call changed anything
    pub transition: CompletionTransition,
}

/// Register the caller.
///
/// The store re-checks admission atomically; losing the last place to a
/// concurrent request is a 409 the client may retry.
///
/// # Errors
///
/// 403 with a reason when admission refuses, 409 on a lost race.
pub async fn register(
    State(state): State<AppState>,
    actor: ActorHeader,
    Path(id): Path<EventId>,
) -> Result<(StatusCode, Json<Registration>), AppError> {
    let registration = state.service.register(id, actor.id()).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

/// Cancel the caller's registration.
///
/// # Errors
///
/// 403 `not_registered` without an active registration.
pub async fn cancel(
    State(state): State<AppState>,
    actor: ActorHeader,
    Path(id): Path<EventId>,
) -> Result<Json<Registration>, AppError> {
    let registration = state.service.cancel_registration(id, actor.id()).await?;
    Ok(Json(registration))
}

/// Set an actor's attendance flag.
///
/// # Errors
///
/// 403 `not_organizer`, or 404 when the actor never registered.
pub async fn set_attendance(
    State(state): State<AppState>,
    organizer: ActorHeader,
    Path((id, actor_id)): Path<(EventId, ActorId)>,
    Json(request): Json<AttendanceRequest>,
) -> Result<Json<Registration>, AppError> {
    let registration = state
        .service
        .set_attendance(id, organizer.id(), actor_id, request.attended)
        .await?;
    Ok(Json(registration))
}

/// Mark the event completed.
///
/// # Errors
///
/// 403 `not_organizer` for anyone but the organizer.
pub async fn complete(
    State(state): State<AppState>,
    organizer: ActorHeader,
    Path(id): Path<EventId>,
) -> Result<Json<CompletionResponse>, AppError> {
    let transition = state.service.complete_event(id, organizer.id()).await?;
    Ok(Json(CompletionResponse {
        event_id: id,
        transition,
    }))
}
