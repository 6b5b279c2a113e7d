//! In-memory record store.
//!
//! Implements every store trait over `HashMap`s behind one `RwLock`. Each write
//! takes the write lock, re-runs the lifecycle function on the stored record
//! and commits in the same critical section, which makes registration a real
//! check-and-reserve: concurrent callers near the capacity boundary serialize
//! on the lock and the losers get [`StoreError::Conflict`].
//!
//! Used by tests, by the server's `memory` backend and by benchmarks.

use chrono::{DateTime, Utc};
use eventgate_core::attendance::{self, CompletionTransition};
use eventgate_core::error::{EngineError, StoreError};
use eventgate_core::lifecycle;
use eventgate_core::store::{
    CertificateStore, EventRecordStore, NotificationFeed, ReviewStore, StoreFuture,
};
use eventgate_core::types::{
    ActorId, Certificate, CertificateId, Event, EventId, NotificationRecord, Registration, Review,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Records {
    events: HashMap<EventId, Event>,
    reviews: HashMap<(EventId, ActorId), Review>,
    certificates: HashMap<CertificateId, Certificate>,
    notifications: HashMap<ActorId, Vec<NotificationRecord>>,
}

/// HashMap-backed implementation of [`eventgate_core::RecordStore`].
///
/// # Example
///
/// ```
/// use eventgate_testing::InMemoryRecordStore;
/// use eventgate_testing::fixtures::EventBuilder;
/// use eventgate_core::store::EventRecordStore;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryRecordStore::new();
/// let event = EventBuilder::new("Meetup").published().build();
/// store.insert_event(event.clone()).await.unwrap();
///
/// let loaded = store.load_event(event.id).await.unwrap();
/// assert_eq!(loaded.title, "Meetup");
/// # });
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryRecordStore {
    records: Arc<RwLock<Records>>,
}

impl InMemoryRecordStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `events`
    #[must_use]
    pub fn with_events(events: impl IntoIterator<Item = Event>) -> Self {
        let store = Self::new();
        if let Ok(mut records) = store.records.write() {
            records
                .events
                .extend(events.into_iter().map(|event| (event.id, event)));
        }
        store
    }

    /// Number of stored events
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.read().map_or(0, |records| records.events.len())
    }

    /// Clear all records (for test isolation)
    pub fn clear(&self) {
        if let Ok(mut records) = self.write() {
            *records = Records::default();
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Records>, StoreError> {
        self.records
            .read()
            .map_err(|_| StoreError::Transport("record store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Records>, StoreError> {
        self.records
            .write()
            .map_err(|_| StoreError::Transport("record store lock poisoned".to_string()))
    }

    /// Runs `apply` against the stored event under the write lock.
    fn modify_event<T>(
        &self,
        id: EventId,
        apply: impl FnOnce(&mut Event) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut records = self.write()?;
        let event = records
            .events
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("event", id))?;

        // Work on a copy so a failed transition leaves the record untouched.
        let mut draft = event.clone();
        let outcome = apply(&mut draft)?;
        *event = draft;
        Ok(outcome)
    }
}

/// Maps an engine error raised under the lock back into the store taxonomy.
fn engine_to_store(error: EngineError) -> StoreError {
    match error {
        EngineError::PolicyDenied(denial) => StoreError::lost_race(denial),
        EngineError::NotFound { entity, id } => StoreError::NotFound { entity, id },
        EngineError::Conflict(message) | EngineError::Validation(message) => {
            StoreError::Conflict(message)
        }
        EngineError::Transport(message) => StoreError::Transport(message),
    }
}

impl EventRecordStore for InMemoryRecordStore {
    fn load_event(&self, id: EventId) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            self.read()?
                .events
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::not_found("event", id))
        })
    }

    fn list_events(&self) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            let mut events: Vec<Event> = self.read()?.events.values().cloned().collect();
            events.sort_by_key(|event| (event.created_at, *event.id.as_uuid()));
            Ok(events)
        })
    }

    fn insert_event(&self, event: Event) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut records = self.write()?;
            if records.events.contains_key(&event.id) {
                return Err(StoreError::Conflict(format!("event {} already exists", event.id)));
            }
            records.events.insert(event.id, event);
            Ok(())
        })
    }

    fn publish(&self, id: EventId, requester: ActorId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            self.modify_event(id, |event| {
                lifecycle::publish(event, &requester).map_err(StoreError::lost_race)
            })
        })
    }

    fn reserve_registration(
        &self,
        id: EventId,
        actor: ActorId,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Registration> {
        Box::pin(async move {
            self.modify_event(id, |event| {
                lifecycle::append_registration(event, actor, now).map_err(StoreError::lost_race)
            })
        })
    }

    fn cancel_registration(&self, id: EventId, actor: ActorId) -> StoreFuture<'_, Registration> {
        Box::pin(async move {
            self.modify_event(id, |event| {
                lifecycle::cancel_registration(event, &actor).map_err(StoreError::lost_race)
            })
        })
    }

    fn set_attendance(
        &self,
        id: EventId,
        requester: ActorId,
        actor: ActorId,
        attended: bool,
    ) -> StoreFuture<'_, Registration> {
        Box::pin(async move {
            self.modify_event(id, |event| {
                attendance::mark_attended(event, &requester, &actor, attended).map_err(engine_to_store)
            })
        })
    }

    fn complete(&self, id: EventId, requester: ActorId) -> StoreFuture<'_, CompletionTransition> {
        Box::pin(async move {
            self.modify_event(id, |event| {
                attendance::mark_completed(event, &requester).map_err(StoreError::lost_race)
            })
        })
    }
}

impl ReviewStore for InMemoryRecordStore {
    fn find_review(&self, event: EventId, actor: ActorId) -> StoreFuture<'_, Option<Review>> {
        Box::pin(async move { Ok(self.read()?.reviews.get(&(event, actor)).cloned()) })
    }

    fn reviews_for(&self, event: EventId) -> StoreFuture<'_, Vec<Review>> {
        Box::pin(async move {
            let mut reviews: Vec<Review> = self
                .read()?
                .reviews
                .values()
                .filter(|review| review.event_id == event)
                .cloned()
                .collect();
            reviews.sort_by_key(|review| review.created_at);
            Ok(reviews)
        })
    }

    fn insert_review(&self, review: Review) -> StoreFuture<'_, Review> {
        Box::pin(async move {
            let mut records = self.write()?;
            let key = (review.event_id, review.actor_id);
            if records.reviews.contains_key(&key) {
                return Err(StoreError::Conflict(format!(
                    "actor {} already reviewed event {}",
                    review.actor_id, review.event_id
                )));
            }
            records.reviews.insert(key, review.clone());
            Ok(review)
        })
    }

    fn replace_review(&self, review: Review) -> StoreFuture<'_, Review> {
        Box::pin(async move {
            let mut records = self.write()?;
            let slot = records
                .reviews
                .get_mut(&(review.event_id, review.actor_id))
                .ok_or_else(|| {
                    StoreError::not_found("review", format!("{}/{}", review.event_id, review.actor_id))
                })?;
            *slot = review.clone();
            Ok(review)
        })
    }

    fn delete_review(&self, event: EventId, actor: ActorId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.write()?
                .reviews
                .remove(&(event, actor))
                .map(|_| ())
                .ok_or_else(|| StoreError::not_found("review", format!("{event}/{actor}")))
        })
    }
}

impl CertificateStore for InMemoryRecordStore {
    fn find_certificate(&self, id: CertificateId) -> StoreFuture<'_, Option<Certificate>> {
        Box::pin(async move { Ok(self.read()?.certificates.get(&id).cloned()) })
    }

    fn insert_certificate(&self, certificate: Certificate) -> StoreFuture<'_, Certificate> {
        Box::pin(async move {
            let mut records = self.write()?;
            let existing = records
                .certificates
                .values()
                .find(|stored| {
                    stored.event_id == certificate.event_id && stored.actor_id == certificate.actor_id
                })
                .cloned();
            if let Some(existing) = existing {
                return Ok(existing);
            }
            records
                .certificates
                .insert(certificate.certificate_id, certificate.clone());
            Ok(certificate)
        })
    }
}

impl NotificationFeed for InMemoryRecordStore {
    fn push_notification(&self, actor: ActorId, record: NotificationRecord) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.write()?.notifications.entry(actor).or_default().push(record);
            Ok(())
        })
    }

    fn notifications_for(&self, actor: ActorId) -> StoreFuture<'_, Vec<NotificationRecord>> {
        Box::pin(async move {
            let mut feed = self
                .read()?
                .notifications
                .get(&actor)
                .cloned()
                .unwrap_or_default();
            // Stable, so records sharing a timestamp keep push order reversed.
            feed.reverse();
            feed.sort_by(|a, b| b.at.cmp(&a.at));
            Ok(feed)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures::EventBuilder;
    use eventgate_core::error::Denial;
    use eventgate_core::types::{Capacity, RegistrationStatus};

    #[tokio::test]
    async fn test_reserve_respects_capacity() {
        let event = EventBuilder::new("Tiny").published().capacity(1).build();
        let store = InMemoryRecordStore::with_events([event.clone()]);

        store
            .reserve_registration(event.id, ActorId::new(), Utc::now())
            .await
            .unwrap();
        let error = store
            .reserve_registration(event.id, ActorId::new(), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(error, StoreError::lost_race(Denial::CapacityFull));

        let stored = store.load_event(event.id).await.unwrap();
        assert_eq!(stored.registrations.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_transition_leaves_record_untouched() {
        let event = EventBuilder::new("Closed").capacity(5).build();
        let store = InMemoryRecordStore::with_events([event.clone()]);

        let error = store
            .reserve_registration(event.id, ActorId::new(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(error, StoreError::Conflict(_)));
        assert!(store.load_event(event.id).await.unwrap().registrations.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_then_rejoin() {
        let event = EventBuilder::new("Rejoin").published().capacity(Capacity::UNLIMITED.value()).build();
        let store = InMemoryRecordStore::with_events([event.clone()]);
        let actor = ActorId::new();

        store.reserve_registration(event.id, actor, Utc::now()).await.unwrap();
        let cancelled = store.cancel_registration(event.id, actor).await.unwrap();
        assert_eq!(cancelled.status, RegistrationStatus::Cancelled);
        store.reserve_registration(event.id, actor, Utc::now()).await.unwrap();

        let stored = store.load_event(event.id).await.unwrap();
        assert_eq!(stored.registrations.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_event_is_not_found() {
        let store = InMemoryRecordStore::new();
        let error = store.load_event(EventId::new()).await.unwrap_err();
        assert!(matches!(error, StoreError::NotFound { entity: "event", .. }));
    }

    #[tokio::test]
    async fn test_review_uniqueness() {
        let store = InMemoryRecordStore::new();
        let now = Utc::now();
        let review = Review {
            event_id: EventId::new(),
            actor_id: ActorId::new(),
            rating: 4,
            comment: String::new(),
            created_at: now,
            updated_at: now,
        };

        store.insert_review(review.clone()).await.unwrap();
        assert!(matches!(
            store.insert_review(review.clone()).await,
            Err(StoreError::Conflict(_))
        ));

        store.delete_review(review.event_id, review.actor_id).await.unwrap();
        assert!(matches!(
            store.delete_review(review.event_id, review.actor_id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_certificate_insert_is_idempotent_per_pair() {
        let store = InMemoryRecordStore::new();
        let certificate = Certificate {
            certificate_id: CertificateId::new(),
            event_id: EventId::new(),
            actor_id: ActorId::new(),
            holder_name: "Holder".into(),
            issued_at: Utc::now(),
            revoked: false,
        };
        let mut second = certificate.clone();
        second.certificate_id = CertificateId::new();

        store.insert_certificate(certificate.clone()).await.unwrap();
        let stored = store.insert_certificate(second).await.unwrap();
        assert_eq!(stored.certificate_id, certificate.certificate_id);
    }

    #[tokio::test]
    async fn test_feed_is_most_recent_first() {
        let store = InMemoryRecordStore::new();
        let actor = ActorId::new();
        let base = Utc::now();
        for (minutes, kind) in [(0, "first"), (10, "second"), (5, "third")] {
            store
                .push_notification(actor, NotificationRecord {
                    kind: kind.to_string(),
                    event_id: None,
                    at: base + chrono::Duration::minutes(minutes),
                    message: String::new(),
                })
                .await
                .unwrap();
        }

        let feed = store.notifications_for(actor).await.unwrap();
        let kinds: Vec<&str> = feed.iter().map(|record| record.kind.as_str()).collect();
        assert_eq!(kinds, ["second", "third", "first"]);
        assert!(store.notifications_for(ActorId::new()).await.unwrap().is_empty());
    }
}
