//! # Eventgate Testing
//!
//! Testing utilities for the event engine.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - [`InMemoryRecordStore`], an atomic in-memory implementation of every store trait
//! - Fixture builders ([`fixtures::EventBuilder`])
//! - proptest strategies for domain types ([`properties`])
//!
//! ## Example
//!
//! ```
//! use eventgate_testing::{InMemoryRecordStore, test_clock};
//! use eventgate_testing::fixtures::EventBuilder;
//! use eventgate_core::admission::can_register;
//! use eventgate_core::clock::Clock;
//!
//! let event = EventBuilder::new("Workshop").published().capacity(1).with_registrations(1).build();
//! let decision = can_register(&event, test_clock().now());
//! assert!(!decision.allowed);
//!
//! let _store = InMemoryRecordStore::with_events([event]);
//! ```

pub mod fixtures;
pub mod memory;

use chrono::{DateTime, Utc};
use eventgate_core::clock::Clock;

/// Mock implementations of the engine's injected dependencies.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use std::sync::{Arc, Mutex};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use eventgate_testing::mocks::FixedClock;
    /// use eventgate_core::clock::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to. Clones share the same time.
    ///
    /// ```
    /// use eventgate_testing::mocks::ManualClock;
    /// use eventgate_core::clock::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = ManualClock::new(Utc::now());
    /// let before = clock.now();
    /// clock.advance(Duration::seconds(5));
    /// assert_eq!(clock.now() - before, Duration::seconds(5));
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a manual clock starting at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward by `by`
        pub fn advance(&self, by: Duration) {
            if let Ok(mut time) = self.time.lock() {
                *time += by;
            }
        }

        /// Jump to `time`
        pub fn set(&self, time: DateTime<Utc>) {
            if let Ok(mut current) = self.time.lock() {
                *current = time;
            }
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
                .lock()
                .map_or_else(|poisoned| *poisoned.into_inner(), |time| *time)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use super::{DateTime, Utc};
    use chrono::{Duration, TimeZone};
    use eventgate_core::types::{
        ActorId, Capacity, Event, EventId, NotificationRecord, Registration, RegistrationStatus,
    };
    use proptest::prelude::*;

    /// Timestamps within 2025, minute resolution
    pub fn timestamp_2025() -> impl Strategy<Value = DateTime<Utc>> {
        (0i64..(365 * 24 * 60)).prop_map(|minutes| {
            Utc.timestamp_opt(1_735_689_600, 0)
                .single()
                .unwrap_or_default()
                + Duration::minutes(minutes)
        })
    }

    /// Capacities biased towards small bounds and unlimited
    pub fn capacity() -> impl Strategy<Value = Capacity> {
        prop_oneof![Just(Capacity::UNLIMITED), (1u32..20).prop_map(Capacity::new)]
    }

    /// Registration status with cancellations in roughly a quarter of rows
    pub fn status() -> impl Strategy<Value = RegistrationStatus> {
        prop_oneof![
            3 => Just(RegistrationStatus::Registered),
            1 => Just(RegistrationStatus::Cancelled),
        ]
    }

    /// A published event with a random title, capacity and registration history
    pub fn event() -> impl Strategy<Value = Event> {
        (
            "[A-Z][a-z]{2,10}",
            capacity(),
            timestamp_2025(),
            prop::collection::vec((status(), timestamp_2025(), any::<bool>()), 0..40),
        )
            .prop_map(|(title, capacity, date, rows)| {
                let mut event = Event::new(EventId::new(), title, ActorId::new(), date, date);
                event.is_published = true;
                event.capacity = capacity;
                let event_id = event.id;
                event.registrations = rows
                    .into_iter()
                    .map(|(status, at, attended)| {
                        let mut registration = Registration::new(event_id, ActorId::new(), at);
                        registration.status = status;
                        registration.attended = attended;
                        registration
                    })
                    .collect();
                event
            })
    }

    /// Notification records drawn from a small key space so duplicates occur
    pub fn notification() -> impl Strategy<Value = NotificationRecord> {
        (
            prop::sample::select(vec!["reminder", "registration_confirmed", "event_completed"]),
            0i64..10,
        )
            .prop_map(|(kind, minutes)| NotificationRecord {
                kind: kind.to_string(),
                event_id: None,
                at: Utc.timestamp_opt(1_735_689_600, 0).single().unwrap_or_default()
                    + Duration::minutes(minutes),
                message: String::new(),
            })
    }

    /// A feed of up to 40 records, some attached to one shared event
    pub fn feed() -> impl Strategy<Value = Vec<NotificationRecord>> {
        prop::collection::vec((notification(), any::<bool>()), 0..40).prop_map(|entries| {
            let shared = EventId::new();
            entries
                .into_iter()
                .map(|(mut record, attached)| {
                    record.event_id = attached.then_some(shared);
                    record
                })
                .collect()
        })
    }
}

/// Installs a fmt subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("eventgate=debug")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use memory::InMemoryRecordStore;
pub use mocks::{FixedClock, ManualClock, test_clock};
