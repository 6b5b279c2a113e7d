//! Event endpoints.
//!
//! - `POST /api/events` - create an unpublished event (caller becomes organizer)
//! - `GET /api/events` - list events, oldest first
//! - `GET /api/events/:id` - event snapshot with its registration window
//! - `POST /api/events/:id/publish` - organizer only, idempotent
//! - `GET /api/events/:id/permissions` - permission set for the calling actor

use super::actor::ActorHeader;
use super::error::AppError;
use crate::server::state::AppState;
use crate::service::PermissionView;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use eventgate_core::admission::{RegistrationWindow, registration_window};
use eventgate_core::lifecycle::EventDraft;
use eventgate_core::types::{Event, EventId};
use serde::Serialize;

/// Event snapshot plus derived admission figures.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    /// The stored event
    #[serde(flatten)]
    pub event: Event,
    /// Admission state at request time
    pub window: RegistrationWindow,
}

/// Response for listing events.
#[derive(Debug, Serialize)]
pub struct ListEventsResponse {
    /// Events, oldest first
    pub events: Vec<Event>,
    /// Number of events
    pub total: usize,
}

/// Create an event.
///
/// # Errors
///
/// 422 for an invalid draft.
pub async fn create_event(
    State(state): State<AppState>,
    actor: ActorHeader,
    Json(draft): Json<EventDraft>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let event = state.service.create_event(actor.id(), draft).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// List events.
///
/// # Errors
///
/// 503 when the store is unavailable.
pub async fn list_events(State(state): State<AppState>) -> Result<Json<ListEventsResponse>, AppError> {
    let events = state.service.list_events().await?;
    Ok(Json(ListEventsResponse {
        total: events.len(),
        events,
    }))
}

/// Get one event.
///
/// # Errors
///
/// 404 for an unknown event.
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<Json<EventResponse>, AppError> {
    let event = state.service.get_event(id).await?;
    let window = registration_window(&event, state.service.clock().now());
    Ok(Json(EventResponse { event, window }))
}

/// Publish an event.
///
/// # Errors
///
/// 403 `not_organizer` for anyone but the organizer.
pub async fn publish_event(
    State(state): State<AppState>,
    actor: ActorHeader,
    Path(id): Path<EventId>,
) -> Result<Json<Event>, AppError> {
    let event = state.service.publish_event(id, actor.id()).await?;
    Ok(Json(event))
}

/// Resolve the caller's permissions on an event.
///
/// # Errors
///
/// 404 for an unknown event.
pub async fn get_permissions(
    State(state): State<AppState>,
    ActorHeader(actor): ActorHeader,
    Path(id): Path<EventId>,
) -> Result<Json<PermissionView>, AppError> {
    let view = state.service.permissions(id, actor).await?;
    Ok(Json(view))
}
