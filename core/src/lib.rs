//! # Eventgate Core
//!
//! Event lifecycle, admission control and analytics engine.
//!
//! Everything in this crate is a synchronous function over snapshot values,
//! except the store traits and [`certificates::verify`], which delegate to
//! storage.
//!
//! ## Components
//!
//! - [`clock`]: injected time source and the shared countdown arithmetic
//! - [`admission`]: does an event accept a registration right now?
//! - [`permissions`]: which actions may this actor take on this event?
//! - [`lifecycle`]: creation, publication, registration and cancellation
//! - [`attendance`]: attendance marks, completion, certificate eligibility
//! - [`reviews`]: review gate and validation
//! - [`certificates`]: issuance and verification lookup
//! - [`notifications`]: feed reconciliation against a caller-owned read set
//! - [`analytics`]: day, event and status aggregation over a date range
//! - [`store`]: dyn-compatible record store traits
//!
//! ## Example
//!
//! ```
//! use eventgate_core::admission::{can_register, ClosedReason};
//! use eventgate_core::types::{ActorId, Capacity, Event, EventId, Registration};
//! use chrono::Utc;
//!
//! let now = Utc::now();
//! let mut event = Event::new(EventId::new(), "Rust Meetup".into(), ActorId::new(), now, now);
//! event.is_published = true;
//! event.capacity = Capacity::new(1);
//! event.registrations.push(Registration::new(event.id, ActorId::new(), now));
//!
//! let decision = can_register(&event, now);
//! assert!(!decision.allowed);
//! assert_eq!(decision.reason, Some(ClosedReason::CapacityFull));
//! ```

pub mod admission;
pub mod analytics;
pub mod attendance;
pub mod certificates;
pub mod clock;
pub mod error;
pub mod lifecycle;
pub mod notifications;
pub mod permissions;
pub mod reviews;
pub mod store;
pub mod types;

pub use admission::{AdmissionDecision, ClosedReason, RegistrationWindow, can_register};
pub use analytics::{AnalyticsReport, DateRange, StatusSummary};
pub use clock::{Clock, SystemClock, TimeRemaining};
pub use error::{Denial, EngineError, StoreError};
pub use permissions::{EventAction, PermissionSet};
pub use store::{
    CertificateStore, EventRecordStore, NotificationFeed, RecordStore, ReviewStore, StoreFuture,
};
pub use types::{
    Actor, ActorId, ActorVerification, AnalyticsBucket, Capacity, Certificate, CertificateId, Event,
    EventId, NotificationRecord, Price, Registration, RegistrationId, RegistrationStatus, Review,
};
