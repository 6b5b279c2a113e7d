//! Builders for test events.
//!
//! Defaults are anchored on [`crate::mocks::test_clock`]: the event starts
//! 30 days after the test epoch, is unpublished, free and unlimited.

use chrono::{DateTime, Duration, Utc};
use eventgate_core::clock::Clock;
use eventgate_core::types::{
    Actor, ActorId, ActorVerification, Capacity, Event, EventId, Price, Registration,
    RegistrationStatus,
};

/// Fluent builder for [`Event`] snapshots.
///
/// # Example
///
/// ```
/// use eventgate_testing::fixtures::EventBuilder;
///
/// let event = EventBuilder::new("Rust Conf")
///     .published()
///     .capacity(2)
///     .with_registrations(2)
///     .build();
///
/// assert_eq!(event.registrations.len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct EventBuilder {
    event: Event,
}

impl EventBuilder {
    /// Start a builder for an event titled `title`
    #[must_use]
    pub fn new(title: &str) -> Self {
        let epoch = crate::mocks::test_clock().now();
        Self {
            event: Event::new(
                EventId::new(),
                title.to_string(),
                ActorId::new(),
                epoch + Duration::days(30),
                epoch,
            ),
        }
    }

    /// Set the organizer
    #[must_use]
    pub const fn organizer(mut self, organizer: ActorId) -> Self {
        self.event.organizer_id = organizer;
        self
    }

    /// Set the start date
    #[must_use]
    pub const fn date(mut self, date: DateTime<Utc>) -> Self {
        self.event.date = date;
        self
    }

    /// Set the registration deadline
    #[must_use]
    pub const fn deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.event.registration_deadline = Some(deadline);
        self
    }

    /// Set capacity (0 = unlimited)
    #[must_use]
    pub const fn capacity(mut self, capacity: u32) -> Self {
        self.event.capacity = Capacity::new(capacity);
        self
    }

    /// Set the ticket price in cents
    #[must_use]
    pub const fn price_cents(mut self, cents: u64) -> Self {
        self.event.price = Price::from_cents(cents);
        self
    }

    /// Mark published
    #[must_use]
    pub const fn published(mut self) -> Self {
        self.event.is_published = true;
        self
    }

    /// Mark completed
    #[must_use]
    pub const fn completed(mut self) -> Self {
        self.event.is_completed = true;
        self
    }

    /// Append `count` active registrations from fresh actors
    #[must_use]
    pub fn with_registrations(mut self, count: usize) -> Self {
        let at = self.event.created_at + Duration::days(1);
        for _ in 0..count {
            self.event
                .registrations
                .push(Registration::new(self.event.id, ActorId::new(), at));
        }
        self
    }

    /// Append one registration for `actor` at `at`
    #[must_use]
    pub fn with_registration(mut self, actor: ActorId, at: DateTime<Utc>) -> Self {
        self.event
            .registrations
            .push(Registration::new(self.event.id, actor, at));
        self
    }

    /// Append one attended registration for `actor`
    #[must_use]
    pub fn with_attendee(mut self, actor: ActorId) -> Self {
        let mut registration =
            Registration::new(self.event.id, actor, self.event.created_at + Duration::days(1));
        registration.attended = true;
        self.event.registrations.push(registration);
        self
    }

    /// Append one cancelled registration for `actor`
    #[must_use]
    pub fn with_cancelled(mut self, actor: ActorId) -> Self {
        let mut registration =
            Registration::new(self.event.id, actor, self.event.created_at + Duration::days(1));
        registration.status = RegistrationStatus::Cancelled;
        self.event.registrations.push(registration);
        self
    }

    /// Finish building
    #[must_use]
    pub fn build(self) -> Event {
        self.event
    }
}

/// A verified actor with a fresh id
#[must_use]
pub fn verified_actor() -> Actor {
    Actor::new(ActorId::new(), ActorVerification::VERIFIED)
}

/// An actor who has not verified their phone number
#[must_use]
pub fn unverified_actor() -> Actor {
    Actor::new(
        ActorId::new(),
        ActorVerification {
            email_verified: true,
            phone_verified: false,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventgate_core::admission::active_registrations;

    #[test]
    fn test_builder_defaults() {
        let event = EventBuilder::new("Defaults").build();
        assert!(!event.is_published);
        assert!(event.capacity.is_unlimited());
        assert!(event.price.is_free());
        assert!(event.date > event.created_at);
    }

    #[test]
    fn test_builder_registrations() {
        let actor = ActorId::new();
        let event = EventBuilder::new("Mixed")
            .with_registrations(3)
            .with_cancelled(ActorId::new())
            .with_attendee(actor)
            .build();

        assert_eq!(event.registrations.len(), 5);
        assert_eq!(active_registrations(&event), 4);
        assert!(event.registrations[4].attended);
    }
}
