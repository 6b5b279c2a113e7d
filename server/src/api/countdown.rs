//! Server-sent countdown to an event's registration deadline.
//!
//! `GET /api/events/:id/countdown` emits one `countdown` event per tick and
//! closes after the `elapsed` tick. Closing the connection cancels the timer.

use super::error::AppError;
use crate::countdown::deadline_countdown;
use crate::server::state::AppState;
use axum::{
    extract::{Path, State},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use eventgate_core::types::EventId;
use futures::{Stream, StreamExt};

/// Stream the countdown.
///
/// # Errors
///
/// 404 for an unknown event or an event without a registration deadline.
pub async fn countdown(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, axum::Error>>>, AppError> {
    let deadline = state
        .service
        .registration_deadline(id)
        .await?
        .ok_or_else(|| AppError::not_found("registration deadline for event", id))?;

    tracing::debug!(event_id = %id, %deadline, "Countdown subscribed");
    let stream = deadline_countdown(state.service.clock(), deadline, state.countdown_period)
        .map(|remaining| SseEvent::default().event("countdown").json_data(remaining));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
