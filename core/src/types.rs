//! Domain types for the event engine.
//!
//! Identifiers, the `Event` record with its nested registrations, reviews,
//! certificates and notification records. These are plain snapshot values:
//! the record store owns persistence, the engine only reads them or returns
//! updated copies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            #[doc = concat!("Parse a `", stringify!($name), "` from its hyphenated string form")]
            #[must_use]
            pub fn parse(raw: &str) -> Option<Self> {
                Uuid::parse_str(raw.trim()).ok().map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an event
    EventId
);
uuid_id!(
    /// Unique identifier for an actor (attendee or organizer)
    ActorId
);
uuid_id!(
    /// Unique identifier for a single registration row
    RegistrationId
);
uuid_id!(
    /// Opaque certificate identifier handed to certificate holders
    CertificateId
);

// ============================================================================
// Value objects
// ============================================================================

/// Maximum number of active registrations. Zero means unlimited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capacity(pub u32);

impl Capacity {
    /// Unlimited capacity
    pub const UNLIMITED: Self = Self(0);

    /// Creates a new `Capacity`
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the capacity value
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Whether this capacity places no bound on registrations
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unlimited() {
            write!(f, "unlimited")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Ticket price in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    /// A free event
    pub const FREE: Self = Self(0);

    /// Creates a `Price` from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the event is free
    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Event and registrations
// ============================================================================

/// Registration status. `Cancelled` is terminal for a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Actor holds a place at the event
    Registered,
    /// Actor gave up their place
    Cancelled,
}

impl RegistrationStatus {
    /// Label used by analytics and the HTTP binding
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Cancelled => "cancelled",
        }
    }
}

/// One actor's registration for one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Row identifier
    pub registration_id: RegistrationId,
    /// Parent event
    pub event_id: EventId,
    /// Registered actor
    pub actor_id: ActorId,
    /// Current status
    pub status: RegistrationStatus,
    /// When the registration was accepted
    pub registered_at: DateTime<Utc>,
    /// Set by the organizer once the actor showed up
    #[serde(default)]
    pub attended: bool,
}

impl Registration {
    /// Creates a new active registration
    #[must_use]
    pub fn new(event_id: EventId, actor_id: ActorId, registered_at: DateTime<Utc>) -> Self {
        Self {
            registration_id: RegistrationId::new(),
            event_id,
            actor_id,
            status: RegistrationStatus::Registered,
            registered_at,
            attended: false,
        }
    }

    /// Whether this row currently holds a place
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == RegistrationStatus::Registered
    }
}

/// Event entity with its registrations in arrival order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier
    pub id: EventId,
    /// Event title (grouping key for analytics)
    pub title: String,
    /// Organizer who may publish, complete and mark attendance
    pub organizer_id: ActorId,
    /// Start of the event
    pub date: DateTime<Utc>,
    /// End of the event, if known
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub end_date: Option<DateTime<Utc>>,
    /// Registrations close strictly after this instant
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub registration_deadline: Option<DateTime<Utc>>,
    /// Maximum active registrations (0 = unlimited)
    #[serde(default)]
    pub capacity: Capacity,
    /// Ticket price
    #[serde(default)]
    pub price: Price,
    /// Visible and open to admission
    #[serde(default)]
    pub is_published: bool,
    /// Completion flag; never reverts once set
    #[serde(default)]
    pub is_completed: bool,
    /// Registration history in arrival order
    #[serde(default)]
    pub registrations: Vec<Registration>,
    /// When the event was created
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Creates a new unpublished event with no registrations
    #[must_use]
    pub const fn new(
        id: EventId,
        title: String,
        organizer_id: ActorId,
        date: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            organizer_id,
            date,
            end_date: None,
            registration_deadline: None,
            capacity: Capacity::UNLIMITED,
            price: Price::FREE,
            is_published: false,
            is_completed: false,
            registrations: Vec::new(),
            created_at,
        }
    }

    /// Whether `actor` organizes this event
    #[must_use]
    pub fn is_organizer(&self, actor: &ActorId) -> bool {
        self.organizer_id == *actor
    }

    /// Whether the stored deadline is strictly before the start date.
    ///
    /// Stale records may violate this; callers treat `false` as a data-quality
    /// warning, never as a hard failure.
    #[must_use]
    pub fn deadline_is_consistent(&self) -> bool {
        self.registration_deadline.is_none_or(|deadline| deadline < self.date)
    }
}

/// Accepts an RFC 3339 timestamp, `null`, or garbage. Garbage becomes `None`.
fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    match raw {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(text)) if text.trim().is_empty() => Ok(None),
        Some(value) => match serde_json::from_value::<DateTime<Utc>>(value.clone()) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(error) => {
                tracing::warn!(%value, %error, "Dropping malformed date from event record");
                Ok(None)
            }
        },
    }
}

// ============================================================================
// Actors
// ============================================================================

/// External verification flags for an actor (email and phone).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorVerification {
    /// Email address confirmed
    pub email_verified: bool,
    /// Phone number confirmed
    pub phone_verified: bool,
}

impl ActorVerification {
    /// Fully verified actor
    pub const VERIFIED: Self = Self {
        email_verified: true,
        phone_verified: true,
    };

    /// Whether both channels are verified
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        self.email_verified && self.phone_verified
    }
}

/// The actor asking for permissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Actor identifier
    pub id: ActorId,
    /// Opaque verification gate input
    #[serde(default)]
    pub verification: ActorVerification,
}

impl Actor {
    /// Creates a new `Actor`
    #[must_use]
    pub const fn new(id: ActorId, verification: ActorVerification) -> Self {
        Self { id, verification }
    }
}

// ============================================================================
// Reviews and certificates
// ============================================================================

/// A review left by an attendee. One per (event, actor).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Reviewed event
    pub event_id: EventId,
    /// Author
    pub actor_id: ActorId,
    /// Star rating, 1 through 5
    pub rating: u8,
    /// Free text
    #[serde(default)]
    pub comment: String,
    /// First submission
    pub created_at: DateTime<Utc>,
    /// Last edit
    pub updated_at: DateTime<Utc>,
}

/// Attendance certificate. The artifact itself is produced elsewhere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Opaque identifier
    pub certificate_id: CertificateId,
    /// Event attended
    pub event_id: EventId,
    /// Holder
    pub actor_id: ActorId,
    /// Display name printed on the certificate
    pub holder_name: String,
    /// Issue time
    pub issued_at: DateTime<Utc>,
    /// Revoked certificates never verify
    #[serde(default)]
    pub revoked: bool,
}

// ============================================================================
// Notifications and analytics output
// ============================================================================

/// A notification as delivered by the server feed. No stable id is guaranteed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Notification type (e.g. `registration_confirmed`)
    #[serde(rename = "type")]
    pub kind: String,
    /// Related event, if any
    #[serde(default)]
    pub event_id: Option<EventId>,
    /// When the notification was produced
    pub at: DateTime<Utc>,
    /// Human readable text
    pub message: String,
}

/// One row of an analytics series.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsBucket {
    /// Day string, event title or status label depending on grouping
    pub key: String,
    /// Number of records in the bucket
    pub count: u64,
}

impl AnalyticsBucket {
    /// Creates a new `AnalyticsBucket`
    #[must_use]
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_json(deadline: &str) -> String {
        format!(
            r#"{{
                "id": "7b0c8f3e-8f0d-4a52-9d6c-0d5b1d2f6a10",
                "title": "Rust Meetup",
                "organizer_id": "1d1b7c1e-3b0a-4f4d-8a84-4c5a4dbd7b11",
                "date": "2025-03-01T18:00:00Z",
                "registration_deadline": {deadline},
                "created_at": "2025-01-01T00:00:00Z"
            }}"#
        )
    }

    #[test]
    fn test_malformed_deadline_is_dropped() {
        let event: Event = serde_json::from_str(&sample_json(r#""not-a-date""#)).unwrap();
        assert!(event.registration_deadline.is_none());
        assert!(event.capacity.is_unlimited());
        assert!(event.registrations.is_empty());
    }

    #[test]
    fn test_valid_deadline_is_kept() {
        let event: Event =
            serde_json::from_str(&sample_json(r#""2025-02-28T12:00:00Z""#)).unwrap();
        assert_eq!(
            event.registration_deadline.unwrap().to_rfc3339(),
            "2025-02-28T12:00:00+00:00"
        );
    }

    #[test]
    fn test_null_deadline() {
        let event: Event = serde_json::from_str(&sample_json("null")).unwrap();
        assert!(event.registration_deadline.is_none());
    }

    #[test]
    fn test_deadline_consistency() {
        let now = Utc::now();
        let mut event = Event::new(EventId::new(), "Talk".into(), ActorId::new(), now, now);
        assert!(event.deadline_is_consistent());

        event.registration_deadline = Some(now - Duration::hours(1));
        assert!(event.deadline_is_consistent());

        event.registration_deadline = Some(now);
        assert!(!event.deadline_is_consistent());
    }

    #[test]
    fn test_id_parse() {
        let id = EventId::new();
        assert_eq!(EventId::parse(&id.to_string()), Some(id));
        assert_eq!(EventId::parse("nope"), None);
    }

    #[test]
    fn test_capacity_display() {
        assert_eq!(Capacity::UNLIMITED.to_string(), "unlimited");
        assert_eq!(Capacity::new(40).to_string(), "40");
        assert_eq!(Price::from_cents(1250).to_string(), "$12.50");
    }
}
