//! Attendance and completion gate.
//!
//! Attendance is set by the organizer per registration. Completion is a
//! one-way switch on the event. Together they unlock certificates; completion
//! alone (plus an active registration) unlocks reviews.

use crate::error::{Denial, EngineError};
use crate::types::{ActorId, Event, Registration};
use serde::{Deserialize, Serialize};

/// Result of a completion request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionTransition {
    /// The event moved from incomplete to completed
    Completed,
    /// The event was already completed; nothing changed
    AlreadyCompleted,
}

/// Sets the attendance flag on the actor's latest registration row.
///
/// Cancelled rows can still be marked; attendance records what happened, not
/// whether the place is currently held.
///
/// # Errors
///
/// - [`EngineError::PolicyDenied`] with [`Denial::NotOrganizer`] when `requester`
///   does not organize the event
/// - [`EngineError::NotFound`] when the actor never registered
pub fn mark_attended(
    event: &mut Event,
    requester: &ActorId,
    actor: &ActorId,
    attended: bool,
) -> Result<Registration, EngineError> {
    if !event.is_organizer(requester) {
        return Err(Denial::NotOrganizer.into());
    }

    let event_id = event.id;
    let registration = event
        .registrations
        .iter_mut()
        .rev()
        .find(|registration| registration.actor_id == *actor)
        .ok_or_else(|| EngineError::not_found("registration", format!("{event_id}/{actor}")))?;

    registration.attended = attended;
    Ok(registration.clone())
}

/// Flips `is_completed` to true. Calling it again is a no-op.
///
/// There is no way back: correcting a wrongly completed event is an
/// administrative action outside this engine.
///
/// # Errors
///
/// Returns [`Denial::NotOrganizer`] when `requester` does not organize the event.
pub fn mark_completed(event: &mut Event, requester: &ActorId) -> Result<CompletionTransition, Denial> {
    if !event.is_organizer(requester) {
        return Err(Denial::NotOrganizer);
    }
    if event.is_completed {
        return Ok(CompletionTransition::AlreadyCompleted);
    }
    event.is_completed = true;
    Ok(CompletionTransition::Completed)
}

/// A certificate may be issued only for attended registrations of completed events.
#[must_use]
pub fn is_certificate_eligible(event: &Event, registration: &Registration) -> bool {
    event.is_completed && registration.attended && registration.event_id == event.id
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{EventId, RegistrationStatus};
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    fn event_with_attendee() -> (Event, ActorId, ActorId) {
        let organizer = ActorId::new();
        let attendee = ActorId::new();
        let now = Utc::now();
        let mut event = Event::new(EventId::new(), "Seminar".into(), organizer, now, now - Duration::days(5));
        event.registrations.push(Registration::new(event.id, attendee, now - Duration::days(2)));
        (event, organizer, attendee)
    }

    #[test]
    fn test_organizer_marks_attendance() {
        let (mut event, organizer, attendee) = event_with_attendee();

        let updated = mark_attended(&mut event, &organizer, &attendee, true).unwrap();
        assert!(updated.attended);
        assert!(event.registrations[0].attended);

        let updated = mark_attended(&mut event, &organizer, &attendee, false).unwrap();
        assert!(!updated.attended);
    }

    #[test]
    fn test_non_organizer_cannot_mark_attendance() {
        let (mut event, _, attendee) = event_with_attendee();
        let error = mark_attended(&mut event, &attendee, &attendee, true).unwrap_err();
        assert_eq!(error, EngineError::PolicyDenied(Denial::NotOrganizer));
        assert!(!event.registrations[0].attended);
    }

    #[test]
    fn test_unknown_attendee_is_not_found() {
        let (mut event, organizer, _) = event_with_attendee();
        let error = mark_attended(&mut event, &organizer, &ActorId::new(), true).unwrap_err();
        assert!(matches!(error, EngineError::NotFound { entity: "registration", .. }));
    }

    #[test]
    fn test_latest_row_is_marked_after_rejoin() {
        let (mut event, organizer, attendee) = event_with_attendee();
        event.registrations[0].status = RegistrationStatus::Cancelled;
        event
            .registrations
            .push(Registration::new(event.id, attendee, Utc::now()));

        mark_attended(&mut event, &organizer, &attendee, true).unwrap();
        assert!(!event.registrations[0].attended);
        assert!(event.registrations[1].attended);
    }

    #[test]
    fn test_completion_is_idempotent() {
        let (mut event, organizer, _) = event_with_attendee();
        assert_eq!(mark_completed(&mut event, &organizer), Ok(CompletionTransition::Completed));
        assert_eq!(
            mark_completed(&mut event, &organizer),
            Ok(CompletionTransition::AlreadyCompleted)
        );
        assert!(event.is_completed);
    }

    #[test]
    fn test_completion_requires_organizer() {
        let (mut event, _, attendee) = event_with_attendee();
        assert_eq!(mark_completed(&mut event, &attendee), Err(Denial::NotOrganizer));
        assert!(!event.is_completed);
    }

    #[test]
    fn test_certificate_eligibility_scenarios() {
        let (mut event, organizer, attendee) = event_with_attendee();
        event.is_completed = true;
        let attended = mark_attended(&mut event, &organizer, &attendee, true).unwrap();
        assert!(is_certificate_eligible(&event, &attended));

        let absent = mark_attended(&mut event, &organizer, &attendee, false).unwrap();
        assert!(!is_certificate_eligible(&event, &absent));
    }

    proptest! {
        #[test]
        fn prop_eligibility_needs_both_flags(completed: bool, attended: bool) {
            let (mut event, _, _) = event_with_attendee();
            event.is_completed = completed;
            event.registrations[0].attended = attended;
            let registration = event.registrations[0].clone();

            prop_assert_eq!(is_certificate_eligible(&event, &registration), completed && attended);
        }
    }
}
