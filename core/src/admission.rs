//! Admission control: does this event accept a registration right now?
//!
//! Rules are evaluated in order and the first failing one wins:
//!
//! 1. unpublished events are closed
//! 2. registration closes strictly after `registration_deadline`
//! 3. a bounded capacity is full once active registrations reach it
//!
//! The result is advisory. Two concurrent callers can both see "allowed" for
//! the last place; the record store re-runs [`can_register`] inside its atomic
//! section (see [`crate::lifecycle::append_registration`]) and is the
//! authoritative gate.

use crate::clock::TimeRemaining;
use crate::types::{Event, RegistrationStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why an event is closed to new registrations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosedReason {
    /// Event is not published
    Unpublished,
    /// `now` is strictly after the registration deadline
    DeadlinePassed,
    /// Active registrations reached a non-zero capacity
    CapacityFull,
}

impl ClosedReason {
    /// Stable machine-readable code
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unpublished => "unpublished",
            Self::DeadlinePassed => "deadline_passed",
            Self::CapacityFull => "capacity_full",
        }
    }
}

/// Outcome of an admission check. Never an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionDecision {
    /// Whether a registration would be accepted
    pub allowed: bool,
    /// Set when `allowed` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ClosedReason>,
}

impl AdmissionDecision {
    /// Registration is open
    pub const ALLOWED: Self = Self {
        allowed: true,
        reason: None,
    };

    /// Registration is closed for `reason`
    #[must_use]
    pub const fn closed(reason: ClosedReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Snapshot of the registration window for display layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationWindow {
    /// Admission decision at `now`
    pub decision: AdmissionDecision,
    /// Countdown to the deadline, when one is set
    pub closes_in: Option<TimeRemaining>,
    /// Places left; `None` means unlimited
    pub remaining: Option<u32>,
    /// Active registrations
    pub registered: usize,
}

/// Counts rows with `status == registered`. Cancelled history never counts.
#[must_use]
pub fn active_registrations(event: &Event) -> usize {
    event
        .registrations
        .iter()
        .filter(|registration| registration.status == RegistrationStatus::Registered)
        .count()
}

/// Places left, or `None` for unlimited capacity.
///
/// Saturates at zero when stale data holds more active rows than capacity.
#[must_use]
pub fn capacity_remaining(event: &Event) -> Option<u32> {
    if event.capacity.is_unlimited() {
        return None;
    }
    let active = u32::try_from(active_registrations(event)).unwrap_or(u32::MAX);
    Some(event.capacity.value().saturating_sub(active))
}

/// Decides whether `event` accepts a registration at `now`.
#[must_use]
pub fn can_register(event: &Event, now: DateTime<Utc>) -> AdmissionDecision {
    if !event.is_published {
        return AdmissionDecision::closed(ClosedReason::Unpublished);
    }

    if let Some(deadline) = event.registration_deadline {
        if TimeRemaining::until(deadline, now).is_elapsed() {
            return AdmissionDecision::closed(ClosedReason::DeadlinePassed);
        }
    }

    if capacity_remaining(event) == Some(0) {
        return AdmissionDecision::closed(ClosedReason::CapacityFull);
    }

    AdmissionDecision::ALLOWED
}

/// Bundles the decision with countdown and capacity figures.
#[must_use]
pub fn registration_window(event: &Event, now: DateTime<Utc>) -> RegistrationWindow {
    RegistrationWindow {
        decision: can_register(event, now),
        closes_in: event
            .registration_deadline
            .map(|deadline| TimeRemaining::until(deadline, now)),
        remaining: capacity_remaining(event),
        registered: active_registrations(event),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{ActorId, Capacity, EventId, Registration};
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    fn published_event(capacity: u32) -> Event {
        let mut event = Event::new(
            EventId::new(),
            "Workshop".to_string(),
            ActorId::new(),
            now() + Duration::days(7),
            now() - Duration::days(30),
        );
        event.is_published = true;
        event.capacity = Capacity::new(capacity);
        event
    }

    fn register(event: &mut Event) -> ActorId {
        let actor = ActorId::new();
        event
            .registrations
            .push(Registration::new(event.id, actor, now() - Duration::days(1)));
        actor
    }

    #[test]
    fn test_open_event_allows() {
        assert_eq!(can_register(&published_event(10), now()), AdmissionDecision::ALLOWED);
    }

    #[test]
    fn test_unpublished_wins_over_everything() {
        let mut event = published_event(1);
        event.is_published = false;
        event.registration_deadline = Some(now() - Duration::days(1));
        register(&mut event);

        assert_eq!(
            can_register(&event, now()),
            AdmissionDecision::closed(ClosedReason::Unpublished)
        );
    }

    #[test]
    fn test_deadline_checked_before_capacity() {
        let mut event = published_event(1);
        event.registration_deadline = Some(now() - Duration::seconds(1));
        register(&mut event);

        assert_eq!(
            can_register(&event, now()).reason,
            Some(ClosedReason::DeadlinePassed)
        );
    }

    #[test]
    fn test_deadline_boundary_is_inclusive() {
        let mut event = published_event(0);
        event.registration_deadline = Some(now());

        assert!(can_register(&event, now()).allowed);
        assert_eq!(
            can_register(&event, now() + Duration::milliseconds(1)),
            AdmissionDecision::closed(ClosedReason::DeadlinePassed)
        );
    }

    #[test]
    fn test_single_place_taken_is_full() {
        let mut event = published_event(1);
        register(&mut event);

        assert_eq!(
            can_register(&event, now()),
            AdmissionDecision {
                allowed: false,
                reason: Some(ClosedReason::CapacityFull)
            }
        );
        assert_eq!(capacity_remaining(&event), Some(0));
    }

    #[test]
    fn test_cancelled_rows_do_not_count() {
        let mut event = published_event(1);
        register(&mut event);
        event.registrations[0].status = RegistrationStatus::Cancelled;
        register(&mut event);
        event.registrations[1].status = RegistrationStatus::Cancelled;

        assert_eq!(active_registrations(&event), 0);
        assert!(can_register(&event, now()).allowed);
    }

    #[test]
    fn test_stale_deadline_after_start_is_tolerated() {
        let mut event = published_event(0);
        event.registration_deadline = Some(event.date + Duration::days(1));

        assert!(!event.deadline_is_consistent());
        assert!(can_register(&event, now()).allowed);
    }

    #[test]
    fn test_overbooked_stale_data_saturates() {
        let mut event = published_event(1);
        register(&mut event);
        register(&mut event);

        assert_eq!(capacity_remaining(&event), Some(0));
        assert_eq!(can_register(&event, now()).reason, Some(ClosedReason::CapacityFull));
    }

    #[test]
    fn test_registration_window() {
        let mut event = published_event(3);
        event.registration_deadline = Some(now() + Duration::hours(2));
        register(&mut event);

        let window = registration_window(&event, now());
        assert!(window.decision.allowed);
        assert_eq!(window.remaining, Some(2));
        assert_eq!(window.registered, 1);
        assert_eq!(window.closes_in.unwrap().total_seconds(), 7200);
    }

    #[test]
    fn test_serialized_decision_shape() {
        let json = serde_json::to_value(AdmissionDecision::closed(ClosedReason::CapacityFull)).unwrap();
        assert_eq!(json["allowed"], false);
        assert_eq!(json["reason"], "capacity_full");

        let json = serde_json::to_value(AdmissionDecision::ALLOWED).unwrap();
        assert!(json.get("reason").is_none());
    }

    proptest! {
        #[test]
        fn prop_unlimited_capacity_is_never_full(registered in 0usize..300, cancelled in 0usize..50) {
            let mut event = published_event(0);
            for _ in 0..registered {
                register(&mut event);
            }
            for _ in 0..cancelled {
                register(&mut event);
                if let Some(last) = event.registrations.last_mut() {
                    last.status = RegistrationStatus::Cancelled;
                }
            }
            prop_assert_ne!(can_register(&event, now()).reason, Some(ClosedReason::CapacityFull));
            prop_assert_eq!(capacity_remaining(&event), None);
        }

        #[test]
        fn prop_full_iff_active_reaches_capacity(capacity in 1u32..50, registered in 0u32..80) {
            let mut event = published_event(capacity);
            for _ in 0..registered {
                register(&mut event);
            }
            let full = can_register(&event, now()).reason == Some(ClosedReason::CapacityFull);
            prop_assert_eq!(full, registered >= capacity);
        }
    }
}
