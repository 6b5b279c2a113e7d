//! Permission resolution for an (actor, event) pair.
//!
//! Every screen that shows event actions branches on one [`PermissionSet`]
//! instead of re-deriving role logic. The resolver is a pure function of its
//! inputs; the only external input is the actor's verification flags.

use crate::admission::{AdmissionDecision, can_register};
use crate::error::Denial;
use crate::types::{Actor, Event, Registration};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Actions an actor can take on an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Take a place
    Register,
    /// Save for later
    Bookmark,
    /// Receive updates
    Follow,
    /// Leave a review
    Review,
    /// Download the attendance certificate
    DownloadCertificate,
}

/// Independent booleans, one per action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    /// Admission open and not already registered
    pub can_register: bool,
    /// Actor holds an active registration
    pub already_registered: bool,
    /// Passes the verification gate
    pub can_bookmark: bool,
    /// Passes the verification gate
    pub can_follow: bool,
    /// Event completed and actor registered
    pub can_review: bool,
    /// Event completed and actor attended
    pub can_download_certificate: bool,
    /// Admission outcome behind `can_register`
    pub admission: AdmissionDecision,
}

impl PermissionSet {
    /// Whether `action` is allowed
    #[must_use]
    pub const fn allows(&self, action: EventAction) -> bool {
        match action {
            EventAction::Register => self.can_register,
            EventAction::Bookmark => self.can_bookmark,
            EventAction::Follow => self.can_follow,
            EventAction::Review => self.can_review,
            EventAction::DownloadCertificate => self.can_download_certificate,
        }
    }

    /// Why `action` is refused, or `None` when it is allowed.
    #[must_use]
    pub fn denial(&self, action: EventAction, event: &Event) -> Option<Denial> {
        if self.allows(action) {
            return None;
        }
        Some(match action {
            EventAction::Register if self.already_registered => Denial::AlreadyRegistered,
            EventAction::Register => self
                .admission
                .reason
                .map_or(Denial::Unpublished, Denial::from),
            EventAction::Bookmark | EventAction::Follow => Denial::Unverified,
            EventAction::Review if !event.is_completed => Denial::NotCompleted,
            EventAction::Review => Denial::NotRegistered,
            EventAction::DownloadCertificate if !event.is_completed => Denial::NotCompleted,
            EventAction::DownloadCertificate => Denial::NotAttended,
        })
    }

    /// Actions that are currently refused
    #[must_use]
    pub fn denied_actions(&self) -> SmallVec<[EventAction; 5]> {
        [
            EventAction::Register,
            EventAction::Bookmark,
            EventAction::Follow,
            EventAction::Review,
            EventAction::DownloadCertificate,
        ]
        .into_iter()
        .filter(|action| !self.allows(*action))
        .collect()
    }
}

/// Derives the permission set.
///
/// `registration` is the actor's latest row for this event, if any.
#[must_use]
pub fn resolve(
    actor: &Actor,
    event: &Event,
    registration: Option<&Registration>,
    now: DateTime<Utc>,
) -> PermissionSet {
    let admission = can_register(event, now);
    let already_registered = registration.is_some_and(|row| row.actor_id == actor.id && row.is_active());
    let verified = actor.verification.is_verified();

    let can_review = event.is_completed && already_registered;
    let can_download_certificate = event.is_completed
        && registration.is_some_and(|row| row.actor_id == actor.id && row.attended);

    PermissionSet {
        can_register: admission.allowed && !already_registered,
        already_registered,
        can_bookmark: verified,
        can_follow: verified,
        can_review,
        can_download_certificate,
        admission,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::admission::ClosedReason;
    use crate::types::{ActorId, ActorVerification, Capacity, EventId, RegistrationStatus};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 10, 8, 0, 0).unwrap()
    }

    fn verified_actor() -> Actor {
        Actor::new(ActorId::new(), ActorVerification::VERIFIED)
    }

    fn event() -> Event {
        let mut event = Event::new(
            EventId::new(),
            "Conference".to_string(),
            ActorId::new(),
            now() + Duration::days(3),
            now() - Duration::days(20),
        );
        event.is_published = true;
        event
    }

    fn registration_for(event: &Event, actor: &Actor) -> Registration {
        Registration::new(event.id, actor.id, now() - Duration::days(1))
    }

    #[test]
    fn test_fresh_actor_on_open_event() {
        let actor = verified_actor();
        let permissions = resolve(&actor, &event(), None, now());

        assert!(permissions.can_register);
        assert!(!permissions.already_registered);
        assert!(permissions.can_bookmark);
        assert!(permissions.can_follow);
        assert!(!permissions.can_review);
        assert!(!permissions.can_download_certificate);
    }

    #[test]
    fn test_registered_actor_cannot_double_register() {
        let actor = verified_actor();
        let event = event();
        let row = registration_for(&event, &actor);
        let permissions = resolve(&actor, &event, Some(&row), now());

        assert!(!permissions.can_register);
        assert!(permissions.already_registered);
        assert!(permissions.admission.allowed);
        assert_eq!(
            permissions.denial(EventAction::Register, &event),
            Some(Denial::AlreadyRegistered)
        );
    }

    #[test]
    fn test_unverified_actor_cannot_bookmark_or_follow() {
        let actor = Actor::new(
            ActorId::new(),
            ActorVerification {
                email_verified: true,
                phone_verified: false,
            },
        );
        let event = event();
        let permissions = resolve(&actor, &event, None, now());

        assert!(!permissions.can_bookmark);
        assert!(!permissions.can_follow);
        assert!(permissions.can_register);
        assert_eq!(
            permissions.denial(EventAction::Follow, &event),
            Some(Denial::Unverified)
        );
    }

    #[test]
    fn test_review_does_not_require_attendance() {
        let actor = verified_actor();
        let mut event = event();
        event.is_completed = true;
        let row = registration_for(&event, &actor);

        let permissions = resolve(&actor, &event, Some(&row), now());
        assert!(permissions.can_review);
        assert!(!permissions.can_download_certificate);
        assert_eq!(
            permissions.denial(EventAction::DownloadCertificate, &event),
            Some(Denial::NotAttended)
        );
    }

    #[test]
    fn test_attended_actor_on_completed_event() {
        let actor = verified_actor();
        let mut event = event();
        event.is_completed = true;
        let mut row = registration_for(&event, &actor);
        row.attended = true;

        let permissions = resolve(&actor, &event, Some(&row), now());
        assert!(permissions.can_review);
        assert!(permissions.can_download_certificate);
        assert!(!permissions.can_register);
    }

    #[test]
    fn test_cancelled_registration_cannot_review() {
        let actor = verified_actor();
        let mut event = event();
        event.is_completed = true;
        let mut row = registration_for(&event, &actor);
        row.status = RegistrationStatus::Cancelled;

        let permissions = resolve(&actor, &event, Some(&row), now());
        assert!(!permissions.can_review);
        assert!(!permissions.already_registered);
        assert_eq!(
            permissions.denial(EventAction::Review, &event),
            Some(Denial::NotRegistered)
        );
    }

    #[test]
    fn test_incomplete_event_gates_review_and_certificate() {
        let actor = verified_actor();
        let event = event();
        let mut row = registration_for(&event, &actor);
        row.attended = true;

        let permissions = resolve(&actor, &event, Some(&row), now());
        assert!(!permissions.can_review);
        assert!(!permissions.can_download_certificate);
        assert_eq!(
            permissions.denial(EventAction::Review, &event),
            Some(Denial::NotCompleted)
        );
    }

    #[test]
    fn test_full_event_reports_capacity_reason() {
        let actor = verified_actor();
        let mut event = event();
        event.capacity = Capacity::new(1);
        event
            .registrations
            .push(Registration::new(event.id, ActorId::new(), now()));

        let permissions = resolve(&actor, &event, None, now());
        assert!(!permissions.can_register);
        assert_eq!(permissions.admission.reason, Some(ClosedReason::CapacityFull));
        assert_eq!(
            permissions.denial(EventAction::Register, &event),
            Some(Denial::CapacityFull)
        );
        assert_eq!(permissions.denied_actions().as_slice(), &[
            EventAction::Register,
            EventAction::Review,
            EventAction::DownloadCertificate
        ]);
    }

    #[test]
    fn test_someone_elses_row_is_ignored() {
        let actor = verified_actor();
        let other = verified_actor();
        let mut event = event();
        event.is_completed = true;
        let mut row = registration_for(&event, &other);
        row.attended = true;

        let permissions = resolve(&actor, &event, Some(&row), now());
        assert!(!permissions.already_registered);
        assert!(!permissions.can_download_certificate);
    }
}
