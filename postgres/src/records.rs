//! Store trait implementations.

use crate::{PostgresRecordStore, classify, decode, encode, transport};
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
use serde_json::Value as JsonValue;

impl PostgresRecordStore {
    /// Load-modify-store under a row lock.
    ///
    /// `apply` runs on the locked snapshot; an error from it rolls the
    /// transaction back and leaves the row untouched.
    #[tracing::instrument(skip(self, apply), fields(event_id = %id))]
    async fn modify_event<T, F>(&self, id: EventId, operation: &'static str, apply: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Event) -> Result<T, StoreError> + Send,
        T: Send,
    {
        let mut tx = self.pool.begin().await.map_err(transport)?;

        let row: Option<(JsonValue,)> =
            sqlx::query_as("SELECT data FROM events WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(transport)?;
        let Some((json,)) = row else {
            return Err(StoreError::not_found("event", id));
        };
        let mut event: Event = decode(json)?;

        let outcome = match apply(&mut event) {
            Ok(outcome) => outcome,
            Err(error) => {
                if matches!(error, StoreError::Conflict(_)) {
                    tracing::debug!(operation, %error, "Transition refused under row lock");
                    metrics::counter!("eventgate_store_conflicts_total", "operation" => operation)
                        .increment(1);
                }
                return Err(error);
            }
        };

        sqlx::query("UPDATE events SET data = $2, updated_at = now() WHERE id = $1")
            .bind(id.as_uuid())
            .bind(encode(&event)?)
            .execute(&mut *tx)
            .await
            .map_err(transport)?;
        tx.commit().await.map_err(transport)?;

        Ok(outcome)
    }
}

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

impl EventRecordStore for PostgresRecordStore {
    fn load_event(&self, id: EventId) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            let row: Option<(JsonValue,)> = sqlx::query_as("SELECT data FROM events WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(transport)?;

            match row {
                Some((json,)) => decode(json),
                None => Err(StoreError::not_found("event", id)),
            }
        })
    }

    fn list_events(&self) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            let rows: Vec<(JsonValue,)> =
                sqlx::query_as("SELECT data FROM events ORDER BY created_at ASC, id ASC")
                    .fetch_all(&self.pool)
                    .await
                    .map_err(transport)?;

            rows.into_iter().map(|(json,)| decode(json)).collect()
        })
    }

    fn insert_event(&self, event: Event) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO events (id, organizer_id, data, created_at)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(event.id.as_uuid())
            .bind(event.organizer_id.as_uuid())
            .bind(encode(&event)?)
            .bind(event.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "event"))?;

            tracing::debug!(event_id = %event.id, "Event inserted");
            Ok(())
        })
    }

    fn publish(&self, id: EventId, requester: ActorId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            self.modify_event(id, "publish", move |event| {
                lifecycle::publish(event, &requester).map_err(StoreError::lost_race)
            })
            .await
        })
    }

    fn reserve_registration(
        &self,
        id: EventId,
        actor: ActorId,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Registration> {
        Box::pin(async move {
            self.modify_event(id, "register", move |event| {
                lifecycle::append_registration(event, actor, now).map_err(StoreError::lost_race)
            })
            .await
        })
    }

    fn cancel_registration(&self, id: EventId, actor: ActorId) -> StoreFuture<'_, Registration> {
        Box::pin(async move {
            self.modify_event(id, "cancel", move |event| {
                lifecycle::cancel_registration(event, &actor).map_err(StoreError::lost_race)
            })
            .await
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
            self.modify_event(id, "attendance", move |event| {
                attendance::mark_attended(event, &requester, &actor, attended).map_err(engine_to_store)
            })
            .await
        })
    }

    fn complete(&self, id: EventId, requester: ActorId) -> StoreFuture<'_, CompletionTransition> {
        Box::pin(async move {
            self.modify_event(id, "complete", move |event| {
                attendance::mark_completed(event, &requester).map_err(StoreError::lost_race)
            })
            .await
        })
    }
}

impl ReviewStore for PostgresRecordStore {
    fn find_review(&self, event: EventId, actor: ActorId) -> StoreFuture<'_, Option<Review>> {
        Box::pin(async move {
            let row: Option<(JsonValue,)> =
                sqlx::query_as("SELECT data FROM reviews WHERE event_id = $1 AND actor_id = $2")
                    .bind(event.as_uuid())
                    .bind(actor.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(transport)?;

            row.map(|(json,)| decode(json)).transpose()
        })
    }

    fn reviews_for(&self, event: EventId) -> StoreFuture<'_, Vec<Review>> {
        Box::pin(async move {
            let rows: Vec<(JsonValue,)> = sqlx::query_as(
                "SELECT data FROM reviews WHERE event_id = $1 ORDER BY created_at ASC",
            )
            .bind(event.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(transport)?;

            rows.into_iter().map(|(json,)| decode(json)).collect()
        })
    }

    fn insert_review(&self, review: Review) -> StoreFuture<'_, Review> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO reviews (event_id, actor_id, data, created_at)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(review.event_id.as_uuid())
            .bind(review.actor_id.as_uuid())
            .bind(encode(&review)?)
            .bind(review.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "review"))?;
            Ok(review)
        })
    }

    fn replace_review(&self, review: Review) -> StoreFuture<'_, Review> {
        Box::pin(async move {
            let result = sqlx::query("UPDATE reviews SET data = $3 WHERE event_id = $1 AND actor_id = $2")
                .bind(review.event_id.as_uuid())
                .bind(review.actor_id.as_uuid())
                .bind(encode(&review)?)
                .execute(&self.pool)
                .await
                .map_err(transport)?;

            if result.rows_affected() == 0 {
                return Err(StoreError::not_found(
                    "review",
                    format!("{}/{}", review.event_id, review.actor_id),
                ));
            }
            Ok(review)
        })
    }

    fn delete_review(&self, event: EventId, actor: ActorId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM reviews WHERE event_id = $1 AND actor_id = $2")
                .bind(event.as_uuid())
                .bind(actor.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(transport)?;

            if result.rows_affected() == 0 {
                return Err(StoreError::not_found("review", format!("{event}/{actor}")));
            }
            Ok(())
        })
    }
}

impl CertificateStore for PostgresRecordStore {
    fn find_certificate(&self, id: CertificateId) -> StoreFuture<'_, Option<Certificate>> {
        Box::pin(async move {
            let row: Option<(JsonValue,)> =
                sqlx::query_as("SELECT data FROM certificates WHERE certificate_id = $1")
                    .bind(id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(transport)?;

            row.map(|(json,)| decode(json)).transpose()
        })
    }

    fn insert_certificate(&self, certificate: Certificate) -> StoreFuture<'_, Certificate> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO certificates (certificate_id, event_id, actor_id, data, issued_at)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (event_id, actor_id) DO NOTHING",
            )
            .bind(certificate.certificate_id.as_uuid())
            .bind(certificate.event_id.as_uuid())
            .bind(certificate.actor_id.as_uuid())
            .bind(encode(&certificate)?)
            .bind(certificate.issued_at)
            .execute(&self.pool)
            .await
            .map_err(transport)?;

            let (json,): (JsonValue,) = sqlx::query_as(
                "SELECT data FROM certificates WHERE event_id = $1 AND actor_id = $2",
            )
            .bind(certificate.event_id.as_uuid())
            .bind(certificate.actor_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(transport)?;

            decode(json)
        })
    }
}

impl NotificationFeed for PostgresRecordStore {
    fn push_notification(&self, actor: ActorId, record: NotificationRecord) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("INSERT INTO notifications (actor_id, at, data) VALUES ($1, $2, $3)")
                .bind(actor.as_uuid())
                .bind(record.at)
                .bind(encode(&record)?)
                .execute(&self.pool)
                .await
                .map_err(transport)?;
            Ok(())
        })
    }

    fn notifications_for(&self, actor: ActorId) -> StoreFuture<'_, Vec<NotificationRecord>> {
        Box::pin(async move {
            let rows: Vec<(JsonValue,)> = sqlx::query_as(
                "SELECT data FROM notifications WHERE actor_id = $1 ORDER BY at DESC, id DESC",
            )
            .bind(actor.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(transport)?;

            rows.into_iter().map(|(json,)| decode(json)).collect()
        })
    }
}
