//! Event lifecycle transitions applied to snapshot values.
//!
//! These functions mutate an `Event` the caller owns. Record stores call them
//! inside their atomic section (lock, transaction) and persist the result; the
//! engine itself never talks to storage.

use crate::admission::can_register;
use crate::error::{Denial, EngineError};
use crate::types::{ActorId, Capacity, Event, EventId, Price, Registration, RegistrationStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest accepted event title.
pub const MAX_TITLE_LEN: usize = 200;

/// Input for creating an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Event title
    pub title: String,
    /// Start of the event
    pub date: DateTime<Utc>,
    /// End of the event
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// Registration deadline
    #[serde(default)]
    pub registration_deadline: Option<DateTime<Utc>>,
    /// Maximum active registrations (0 = unlimited)
    #[serde(default)]
    pub capacity: Capacity,
    /// Ticket price
    #[serde(default)]
    pub price: Price,
}

/// Checks a draft and builds the unpublished event.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] when the title is empty or too long, the
/// deadline is not strictly before the start, or the end precedes the start.
pub fn create_event(
    draft: EventDraft,
    organizer_id: ActorId,
    now: DateTime<Utc>,
) -> Result<Event, EngineError> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(EngineError::Validation("Event title cannot be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(EngineError::Validation(format!(
            "Event title too long: {} characters (max {MAX_TITLE_LEN})",
            title.chars().count()
        )));
    }
    if let Some(deadline) = draft.registration_deadline {
        if deadline >= draft.date {
            return Err(EngineError::Validation(
                "Registration deadline must be before the event starts".to_string(),
            ));
        }
    }
    if let Some(end) = draft.end_date {
        if end < draft.date {
            return Err(EngineError::Validation(
                "Event cannot end before it starts".to_string(),
            ));
        }
    }

    let mut event = Event::new(EventId::new(), title.to_string(), organizer_id, draft.date, now);
    event.end_date = draft.end_date;
    event.registration_deadline = draft.registration_deadline;
    event.capacity = draft.capacity;
    event.price = draft.price;
    Ok(event)
}

/// Marks the event published. Returns `false` if it already was.
///
/// # Errors
///
/// Returns [`Denial::NotOrganizer`] when `requester` does not organize the event.
pub fn publish(event: &mut Event, requester: &ActorId) -> Result<bool, Denial> {
    if !event.is_organizer(requester) {
        return Err(Denial::NotOrganizer);
    }
    if event.is_published {
        return Ok(false);
    }
    event.is_published = true;
    Ok(true)
}

/// The actor's most recent registration row, active or not.
#[must_use]
pub fn registration_of<'a>(event: &'a Event, actor: &ActorId) -> Option<&'a Registration> {
    event
        .registrations
        .iter()
        .rev()
        .find(|registration| registration.actor_id == *actor)
}

/// Whether the actor currently holds an active registration.
#[must_use]
pub fn is_registered(event: &Event, actor: &ActorId) -> bool {
    event
        .registrations
        .iter()
        .any(|registration| registration.actor_id == *actor && registration.is_active())
}

/// Admits `actor` and appends a new row.
///
/// Re-registering after a cancellation appends a fresh row; the cancelled row
/// stays in the history untouched.
///
/// # Errors
///
/// Returns [`Denial::AlreadyRegistered`] for an actor with an active row, or the
/// admission rule that failed.
pub fn append_registration(
    event: &mut Event,
    actor: ActorId,
    now: DateTime<Utc>,
) -> Result<Registration, Denial> {
    if is_registered(event, &actor) {
        return Err(Denial::AlreadyRegistered);
    }
    let decision = can_register(event, now);
    if let Some(reason) = decision.reason {
        return Err(reason.into());
    }

    let registration = Registration::new(event.id, actor, now);
    event.registrations.push(registration.clone());
    Ok(registration)
}

/// Moves the actor's active row to `cancelled`.
///
/// # Errors
///
/// Returns [`Denial::NotRegistered`] when the actor has no active row.
pub fn cancel_registration(event: &mut Event, actor: &ActorId) -> Result<Registration, Denial> {
    let registration = event
        .registrations
        .iter_mut()
        .rev()
        .find(|registration| registration.actor_id == *actor && registration.is_active())
        .ok_or(Denial::NotRegistered)?;

    registration.status = RegistrationStatus::Cancelled;
    Ok(registration.clone())
}
