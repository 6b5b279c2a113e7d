//! Review policy.
//!
//! A review may be written, edited or deleted only while the event is
//! completed and the author holds an active registration. Attendance does not
//! matter here; it gates certificates only.

use crate::error::{Denial, EngineError};
use crate::types::{ActorId, Event, Registration, Review};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest accepted review comment.
pub const MAX_COMMENT_LEN: usize = 2000;

/// Rating and comment submitted by the author.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewInput {
    /// Star rating, 1 through 5
    pub rating: u8,
    /// Free text
    #[serde(default)]
    pub comment: String,
}

/// Checks the completion gate for `actor`.
///
/// # Errors
///
/// Returns [`Denial::NotCompleted`] before completion and
/// [`Denial::NotRegistered`] without an active registration.
pub fn review_gate(
    event: &Event,
    actor: &ActorId,
    registration: Option<&Registration>,
) -> Result<(), Denial> {
    if !event.is_completed {
        return Err(Denial::NotCompleted);
    }
    match registration {
        Some(row) if row.actor_id == *actor && row.event_id == event.id && row.is_active() => Ok(()),
        _ => Err(Denial::NotRegistered),
    }
}

/// Validates rating range and comment length.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] describing the first problem found.
pub fn validate_review(input: &ReviewInput) -> Result<(), EngineError> {
    if !(1..=5).contains(&input.rating) {
        return Err(EngineError::Validation(format!(
            "Rating must be between 1 and 5 (got {})",
            input.rating
        )));
    }
    if input.comment.chars().count() > MAX_COMMENT_LEN {
        return Err(EngineError::Validation(format!(
            "Review comment too long (max {MAX_COMMENT_LEN} characters)"
        )));
    }
    Ok(())
}

/// Builds a new review after running the gate and validation.
///
/// # Errors
///
/// Returns the gate denial or validation failure.
pub fn compose_review(
    event: &Event,
    actor: &ActorId,
    registration: Option<&Registration>,
    input: ReviewInput,
    now: DateTime<Utc>,
) -> Result<Review, EngineError> {
    review_gate(event, actor, registration)?;
    validate_review(&input)?;
    Ok(Review {
        event_id: event.id,
        actor_id: *actor,
        rating: input.rating,
        comment: input.comment.trim().to_string(),
        created_at: now,
        updated_at: now,
    })
}

/// Applies an edit to an existing review.
///
/// # Errors
///
/// Returns the gate denial or validation failure.
pub fn revise_review(
    event: &Event,
    existing: &Review,
    registration: Option<&Registration>,
    input: ReviewInput,
    now: DateTime<Utc>,
) -> Result<Review, EngineError> {
    review_gate(event, &existing.actor_id, registration)?;
    validate_review(&input)?;
    Ok(Review {
        rating: input.rating,
        comment: input.comment.trim().to_string(),
        updated_at: now,
        ..existing.clone()
    })
}
