//! Record store abstractions.
//!
//! The store owns every persistent record. The engine hands it snapshots and
//! decisions; the store applies them atomically.
//!
//! # Authoritative checks
//!
//! Commands run their policy checks twice. The command layer checks a
//! snapshot first so it can answer with a precise denial. The store then
//! re-applies the same lifecycle function inside its atomic section (a mutex,
//! a `SELECT ... FOR UPDATE` transaction). A denial at that point means a
//! concurrent writer changed the record after the snapshot was read, and the
//! store reports it as [`StoreError::Conflict`] via [`StoreError::lost_race`].
//!
//! # Dyn Compatibility
//!
//! Methods return [`StoreFuture`] rather than using `async fn` so the traits
//! can be used as `Arc<dyn RecordStore>`.
//!
//! # Implementations
//!
//! - `InMemoryRecordStore` (in `eventgate-testing`)
//! - `PostgresRecordStore` (in `eventgate-postgres`)

use crate::attendance::CompletionTransition;
use crate::error::StoreError;
use crate::types::{
    ActorId, Certificate, CertificateId, Event, EventId, NotificationRecord, Registration, Review,
};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by every store method.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Events with their nested registrations.
pub trait EventRecordStore: Send + Sync {
    /// Loads one event snapshot.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `Transport` on storage failure.
    fn load_event(&self, id: EventId) -> StoreFuture<'_, Event>;

    /// Lists every event, oldest first by `created_at`.
    ///
    /// # Errors
    ///
    /// `Transport` on storage failure.
    fn list_events(&self) -> StoreFuture<'_, Vec<Event>>;

    /// Persists a newly created event.
    ///
    /// # Errors
    ///
    /// `Conflict` if the id is taken, `Transport` on storage failure.
    fn insert_event(&self, event: Event) -> StoreFuture<'_, ()>;

    /// Applies [`crate::lifecycle::publish`]. Returns whether the flag changed.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Conflict` (denied inside the atomic section) or `Transport`.
    fn publish(&self, id: EventId, requester: ActorId) -> StoreFuture<'_, bool>;

    /// Check-and-reserve: applies [`crate::lifecycle::append_registration`]
    /// atomically, so active registrations never exceed capacity.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Conflict` when admission fails under the lock, or `Transport`.
    fn reserve_registration(
        &self,
        id: EventId,
        actor: ActorId,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Registration>;

    /// Applies [`crate::lifecycle::cancel_registration`].
    ///
    /// # Errors
    ///
    /// `NotFound`, `Conflict` or `Transport`.
    fn cancel_registration(&self, id: EventId, actor: ActorId) -> StoreFuture<'_, Registration>;

    /// Applies [`crate::attendance::mark_attended`].
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown event or registration, `Conflict` or `Transport`.
    fn set_attendance(
        &self,
        id: EventId,
        requester: ActorId,
        actor: ActorId,
        attended: bool,
    ) -> StoreFuture<'_, Registration>;

    /// Applies [`crate::attendance::mark_completed`].
    ///
    /// # Errors
    ///
    /// `NotFound`, `Conflict` or `Transport`.
    fn complete(&self, id: EventId, requester: ActorId) -> StoreFuture<'_, CompletionTransition>;
}

/// One review per (event, actor).
pub trait ReviewStore: Send + Sync {
    /// The actor's review of the event, if any.
    ///
    /// # Errors
    ///
    /// `Transport` on storage failure.
    fn find_review(&self, event: EventId, actor: ActorId) -> StoreFuture<'_, Option<Review>>;

    /// Reviews of one event, oldest first.
    ///
    /// # Errors
    ///
    /// `Transport` on storage failure.
    fn reviews_for(&self, event: EventId) -> StoreFuture<'_, Vec<Review>>;

    /// Inserts a new review.
    ///
    /// # Errors
    ///
    /// `Conflict` when the pair already has a review, `Transport` on storage failure.
    fn insert_review(&self, review: Review) -> StoreFuture<'_, Review>;

    /// Replaces an existing review.
    ///
    /// # Errors
    ///
    /// `NotFound` when there is nothing to replace, `Transport` on storage failure.
    fn replace_review(&self, review: Review) -> StoreFuture<'_, Review>;

    /// Deletes the actor's review.
    ///
    /// # Errors
    ///
    /// `NotFound` when there is nothing to delete, `Transport` on storage failure.
    fn delete_review(&self, event: EventId, actor: ActorId) -> StoreFuture<'_, ()>;
}

/// Issued certificates.
pub trait CertificateStore: Send + Sync {
    /// Looks up a certificate by its opaque id.
    ///
    /// # Errors
    ///
    /// `Transport` only. An unknown id is `Ok(None)`.
    fn find_certificate(&self, id: CertificateId) -> StoreFuture<'_, Option<Certificate>>;

    /// Stores `certificate` unless the (event, actor) pair already has one,
    /// in which case the existing certificate is returned untouched.
    ///
    /// # Errors
    ///
    /// `Transport` on storage failure.
    fn insert_certificate(&self, certificate: Certificate) -> StoreFuture<'_, Certificate>;
}

/// Server-side notification feed. Read state is never stored here.
pub trait NotificationFeed: Send + Sync {
    /// Appends a record to the actor's feed.
    ///
    /// # Errors
    ///
    /// `Transport` on storage failure.
    fn push_notification(&self, actor: ActorId, record: NotificationRecord) -> StoreFuture<'_, ()>;

    /// The actor's feed, most recent first.
    ///
    /// # Errors
    ///
    /// `Transport` on storage failure.
    fn notifications_for(&self, actor: ActorId) -> StoreFuture<'_, Vec<NotificationRecord>>;
}

/// Everything the command layer needs from storage.
pub trait RecordStore: EventRecordStore + ReviewStore + CertificateStore + NotificationFeed {}

impl<T> RecordStore for T where T: EventRecordStore + ReviewStore + CertificateStore + NotificationFeed {}
