//! Command layer.
//!
//! [`EventService`] is the imperative shell around the pure engine: it loads a
//! snapshot from the record store, runs the advisory checks against it, then
//! asks the store to apply the change atomically. A check that passed on the
//! snapshot but failed inside the store surfaces as [`EngineError::Conflict`].

use crate::metrics::{self, RegistrationOutcome};
use chrono::{DateTime, Utc};
use eventgate_core::admission::{RegistrationWindow, can_register, registration_window};
use eventgate_core::analytics::{AnalyticsReport, DateRange, build_report};
use eventgate_core::attendance::CompletionTransition;
use eventgate_core::certificates::{self, CertificateVerification};
use eventgate_core::clock::Clock;
use eventgate_core::error::{Denial, EngineError, Result, StoreError};
use eventgate_core::lifecycle::{self, EventDraft};
use eventgate_core::notifications::{self, NotificationView, ReadKeys};
use eventgate_core::permissions::{self, EventAction, PermissionSet};
use eventgate_core::reviews::{self, ReviewInput};
use eventgate_core::store::RecordStore;
use eventgate_core::types::{
    Actor, ActorId, Certificate, Event, EventId, NotificationRecord, Registration, Review,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Notification kinds pushed to actor feeds.
pub mod kinds {
    /// A place was reserved
    pub const REGISTRATION_CONFIRMED: &str = "registration_confirmed";
    /// A registration was cancelled
    pub const REGISTRATION_CANCELLED: &str = "registration_cancelled";
    /// The organizer marked the event completed
    pub const EVENT_COMPLETED: &str = "event_completed";
    /// A certificate was issued
    pub const CERTIFICATE_ISSUED: &str = "certificate_issued";
}

/// A refused action with the reason a caller can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeniedAction {
    /// The action
    pub action: EventAction,
    /// Why it is refused
    pub reason: Denial,
}

/// Everything a client needs to render the actions on an event page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionView {
    /// Event the permissions apply to
    pub event_id: EventId,
    /// Actor the permissions apply to
    pub actor_id: ActorId,
    /// The resolved booleans
    pub permissions: PermissionSet,
    /// Admission, countdown and capacity figures
    pub window: RegistrationWindow,
    /// Refused actions with reasons
    pub denied: Vec<DeniedAction>,
}

/// Result of a certificate request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateIssue {
    /// The stored certificate
    pub certificate: Certificate,
    /// False when the actor already held a certificate for this event
    pub newly_issued: bool,
}

/// Event commands and queries over a record store.
#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    analytics_top_n: usize,
}

impl EventService {
    /// Creates a new `EventService`
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>, analytics_top_n: usize) -> Self {
        Self {
            store,
            clock,
            analytics_top_n: analytics_top_n.max(1),
        }
    }

    /// The clock used for every decision
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    async fn load(&self, id: EventId) -> Result<Event> {
        let event = self.store.load_event(id).await?;
        if !event.deadline_is_consistent() {
            tracing::warn!(
                event_id = %id,
                deadline = ?event.registration_deadline,
                date = %event.date,
                "Registration deadline is not before the event start"
            );
        }
        Ok(event)
    }

    async fn notify(&self, actor: ActorId, kind: &str, event: &Event, message: String) {
        let record = NotificationRecord {
            kind: kind.to_string(),
            event_id: Some(event.id),
            at: self.clock.now(),
            message,
        };
        if let Err(error) = self.store.push_notification(actor, record).await {
            tracing::warn!(actor_id = %actor, kind, %error, "Failed to record notification");
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Validates a draft and stores the new unpublished event.
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] for a bad draft, transport failures otherwise.
    #[tracing::instrument(skip_all, fields(organizer_id = %organizer))]
    pub async fn create_event(&self, organizer: ActorId, draft: EventDraft) -> Result<Event> {
        let event = lifecycle::create_event(draft, organizer, self.clock.now())?;
        self.store.insert_event(event.clone()).await?;

        metrics::record_event_created();
        tracing::info!(event_id = %event.id, title = %event.title, "Event created");
        Ok(event)
    }

    /// Loads one event snapshot.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown id.
    pub async fn get_event(&self, id: EventId) -> Result<Event> {
        self.load(id).await
    }

    /// All events, oldest first.
    ///
    /// # Errors
    ///
    /// Transport failures only.
    pub async fn list_events(&self) -> Result<Vec<Event>> {
        Ok(self.store.list_events().await?)
    }

    /// Publishes an event. Publishing twice is a no-op.
    ///
    /// # Errors
    ///
    /// [`Denial::NotOrganizer`] unless `requester` organizes the event.
    #[tracing::instrument(skip_all, fields(event_id = %id, requester = %requester))]
    pub async fn publish_event(&self, id: EventId, requester: ActorId) -> Result<Event> {
        let event = self.load(id).await?;
        if !event.is_organizer(&requester) {
            return Err(Denial::NotOrganizer.into());
        }

        let changed = self.store.publish(id, requester).await?;
        if changed {
            tracing::info!("Event published");
        }
        self.load(id).await
    }

    /// Resolves what `actor` may do on an event right now.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown event.
    pub async fn permissions(&self, id: EventId, actor: Actor) -> Result<PermissionView> {
        let event = self.load(id).await?;
        let now = self.clock.now();
        let registration = lifecycle::registration_of(&event, &actor.id);
        let permissions = permissions::resolve(&actor, &event, registration, now);

        let denied = permissions
            .denied_actions()
            .into_iter()
            .filter_map(|action| {
                permissions
                    .denial(action, &event)
                    .map(|reason| DeniedAction { action, reason })
            })
            .collect();

        Ok(PermissionView {
            event_id: event.id,
            actor_id: actor.id,
            permissions,
            window: registration_window(&event, now),
            denied,
        })
    }

    // ------------------------------------------------------------------
    // Registrations
    // ------------------------------------------------------------------

    /// Reserves a place for `actor`.
    ///
    /// The snapshot check gives a precise denial reason; the store re-runs the
    /// same check under its lock and reports a lost race as a conflict.
    ///
    /// # Errors
    ///
    /// - [`EngineError::PolicyDenied`] when the snapshot refuses the registration
    /// - [`EngineError::Conflict`] when the store refuses it after the pre-check passed
    #[tracing::instrument(skip_all, fields(event_id = %id, actor_id = %actor))]
    pub async fn register(&self, id: EventId, actor: ActorId) -> Result<Registration> {
        let event = self.load(id).await?;
        let now = self.clock.now();

        if lifecycle::is_registered(&event, &actor) {
            metrics::record_registration(RegistrationOutcome::Denied);
            return Err(Denial::AlreadyRegistered.into());
        }
        let decision = can_register(&event, now);
        if let Some(reason) = decision.reason {
            metrics::record_registration(RegistrationOutcome::Denied);
            tracing::debug!(reason = reason.as_str(), "Registration refused");
            return Err(Denial::from(reason).into());
        }

        let registration = match self.store.reserve_registration(id, actor, now).await {
            Ok(registration) => registration,
            Err(error @ StoreError::Conflict(_)) => {
                metrics::record_registration(RegistrationOutcome::Conflict);
                tracing::warn!(%error, "Registration lost a race");
                return Err(error.into());
            }
            Err(error) => return Err(error.into()),
        };

        metrics::record_registration(RegistrationOutcome::Reserved);
        tracing::info!(registration_id = %registration.registration_id, "Registration confirmed");
        self.notify(
            actor,
            kinds::REGISTRATION_CONFIRMED,
            &event,
            format!("You are registered for {}", event.title),
        )
        .await;
        Ok(registration)
    }

    /// Cancels `actor`'s active registration.
    ///
    /// # Errors
    ///
    /// [`Denial::NotRegistered`] without an active registration.
    #[tracing::instrument(skip_all, fields(event_id = %id, actor_id = %actor))]
    pub async fn cancel_registration(&self, id: EventId, actor: ActorId) -> Result<Registration> {
        let event = self.load(id).await?;
        if !lifecycle::is_registered(&event, &actor) {
            return Err(Denial::NotRegistered.into());
        }

        let registration = self.store.cancel_registration(id, actor).await?;
        metrics::record_cancellation();
        tracing::info!("Registration cancelled");
        self.notify(
            actor,
            kinds::REGISTRATION_CANCELLED,
            &event,
            format!("Your registration for {} was cancelled", event.title),
        )
        .await;
        Ok(registration)
    }

    // ------------------------------------------------------------------
    // Attendance and completion
    // ------------------------------------------------------------------

    /// Sets the attended flag on `actor`'s latest registration.
    ///
    /// # Errors
    ///
    /// [`Denial::NotOrganizer`] for anyone but the organizer,
    /// [`EngineError::NotFound`] when `actor` never registered.
    #[tracing::instrument(skip_all, fields(event_id = %id, actor_id = %actor))]
    pub async fn set_attendance(
        &self,
        id: EventId,
        requester: ActorId,
        actor: ActorId,
        attended: bool,
    ) -> Result<Registration> {
        let event = self.load(id).await?;
        if !event.is_organizer(&requester) {
            return Err(Denial::NotOrganizer.into());
        }
        if lifecycle::registration_of(&event, &actor).is_none() {
            return Err(EngineError::not_found("registration", actor));
        }

        let registration = self
            .store
            .set_attendance(id, requester, actor, attended)
            .await?;
        metrics::record_attendance(attended);
        Ok(registration)
    }

    /// Marks the event completed and tells every active registrant.
    ///
    /// # Errors
    ///
    /// [`Denial::NotOrganizer`] for anyone but the organizer.
    #[tracing::instrument(skip_all, fields(event_id = %id))]
    pub async fn complete_event(&self, id: EventId, requester: ActorId) -> Result<CompletionTransition> {
        let event = self.load(id).await?;
        if !event.is_organizer(&requester) {
            return Err(Denial::NotOrganizer.into());
        }

        let transition = self.store.complete(id, requester).await?;
        match transition {
            CompletionTransition::Completed => {
                metrics::record_completion("completed");
                tracing::info!("Event completed");
                let completed = self.load(id).await?;
                for registration in completed.registrations.iter().filter(|row| row.is_active()) {
                    self.notify(
                        registration.actor_id,
                        kinds::EVENT_COMPLETED,
                        &completed,
                        format!("{} is complete. You can now leave a review", completed.title),
                    )
                    .await;
                }
            }
            CompletionTransition::AlreadyCompleted => {
                metrics::record_completion("already_completed");
                tracing::debug!("Event was already completed");
            }
        }
        Ok(transition)
    }

    // ------------------------------------------------------------------
    // Reviews
    // ------------------------------------------------------------------

    /// Submits the actor's review.
    ///
    /// # Errors
    ///
    /// Gate denials, validation failures, or [`EngineError::Conflict`] when the
    /// actor already reviewed this event.
    #[tracing::instrument(skip_all, fields(event_id = %id, actor_id = %actor))]
    pub async fn submit_review(&self, id: EventId, actor: ActorId, input: ReviewInput) -> Result<Review> {
        let event = self.load(id).await?;
        let registration = lifecycle::registration_of(&event, &actor);
        let review = reviews::compose_review(&event, &actor, registration, input, self.clock.now())?;

        if self.store.find_review(id, actor).await?.is_some() {
            return Err(EngineError::Conflict(
                "You have already reviewed this event".to_string(),
            ));
        }

        let review = self.store.insert_review(review).await?;
        metrics::record_review("submitted");
        Ok(review)
    }

    /// Edits the actor's review.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] without an existing review, gate denials or
    /// validation failures otherwise.
    #[tracing::instrument(skip_all, fields(event_id = %id, actor_id = %actor))]
    pub async fn update_review(&self, id: EventId, actor: ActorId, input: ReviewInput) -> Result<Review> {
        let event = self.load(id).await?;
        let existing = self
            .store
            .find_review(id, actor)
            .await?
            .ok_or_else(|| EngineError::not_found("review", format!("{id}/{actor}")))?;

        let registration = lifecycle::registration_of(&event, &actor);
        let revised = reviews::revise_review(&event, &existing, registration, input, self.clock.now())?;

        let review = self.store.replace_review(revised).await?;
        metrics::record_review("updated");
        Ok(review)
    }

    /// Deletes the actor's review.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] without an existing review, or the gate
    /// denial when the actor no longer qualifies.
    #[tracing::instrument(skip_all, fields(event_id = %id, actor_id = %actor))]
    pub async fn delete_review(&self, id: EventId, actor: ActorId) -> Result<()> {
        let event = self.load(id).await?;
        if self.store.find_review(id, actor).await?.is_none() {
            return Err(EngineError::not_found("review", format!("{id}/{actor}")));
        }
        reviews::review_gate(&event, &actor, lifecycle::registration_of(&event, &actor))?;

        self.store.delete_review(id, actor).await?;
        metrics::record_review("deleted");
        Ok(())
    }

    /// Reviews for an event, oldest first.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown event.
    pub async fn list_reviews(&self, id: EventId) -> Result<Vec<Review>> {
        self.store.load_event(id).await?;
        Ok(self.store.reviews_for(id).await?)
    }

    // ------------------------------------------------------------------
    // Certificates
    // ------------------------------------------------------------------

    /// Issues the actor's certificate, or returns the one already issued.
    ///
    /// # Errors
    ///
    /// [`Denial::NotRegistered`], [`Denial::NotCompleted`] or
    /// [`Denial::NotAttended`] when not eligible; validation for an empty name.
    #[tracing::instrument(skip_all, fields(event_id = %id, actor_id = %actor))]
    pub async fn issue_certificate(
        &self,
        id: EventId,
        actor: ActorId,
        holder_name: &str,
    ) -> Result<CertificateIssue> {
        if holder_name.trim().is_empty() {
            return Err(EngineError::Validation(
                "Certificate holder name cannot be empty".to_string(),
            ));
        }

        let event = self.load(id).await?;
        let registration =
            lifecycle::registration_of(&event, &actor).ok_or(Denial::NotRegistered)?;
        let candidate = certificates::issue(&event, registration, holder_name, self.clock.now())?;

        let certificate = self.store.insert_certificate(candidate.clone()).await?;
        let newly_issued = certificate.certificate_id == candidate.certificate_id;
        if newly_issued {
            metrics::record_certificate_issued();
            tracing::info!(certificate_id = %certificate.certificate_id, "Certificate issued");
            self.notify(
                actor,
                kinds::CERTIFICATE_ISSUED,
                &event,
                format!("Your certificate for {} is ready", event.title),
            )
            .await;
        }

        Ok(CertificateIssue {
            certificate,
            newly_issued,
        })
    }

    /// Verifies a certificate id. Unknown or malformed ids are a valid "no".
    ///
    /// # Errors
    ///
    /// Transport failures only.
    pub async fn verify_certificate(&self, raw_id: &str) -> Result<CertificateVerification> {
        let verification = certificates::verify(self.store.as_ref(), raw_id).await?;
        metrics::record_certificate_verification(verification.valid);
        Ok(verification)
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    /// The actor's raw feed, most recent first.
    ///
    /// # Errors
    ///
    /// Transport failures only.
    pub async fn notifications(&self, actor: ActorId) -> Result<Vec<NotificationRecord>> {
        Ok(self.store.notifications_for(actor).await?)
    }

    /// The actor's feed merged with a client-held read set.
    ///
    /// # Errors
    ///
    /// Transport failures only.
    pub async fn reconcile_notifications(
        &self,
        actor: ActorId,
        read_keys: &ReadKeys,
    ) -> Result<NotificationView> {
        let feed = self.store.notifications_for(actor).await?;
        Ok(notifications::reconcile(&feed, read_keys))
    }

    // ------------------------------------------------------------------
    // Analytics
    // ------------------------------------------------------------------

    /// Pre-aggregated report over every event.
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] when `start` is after `end`.
    #[tracing::instrument(skip(self))]
    pub async fn analytics(&self, range: DateRange) -> Result<AnalyticsReport> {
        if range.is_inverted() {
            return Err(EngineError::Validation(
                "Analytics range start must not be after its end".to_string(),
            ));
        }

        let started = Instant::now();
        let events = self.store.list_events().await?;
        let report = build_report(&events, range, self.analytics_top_n, self.clock.now());
        metrics::record_analytics_query(started.elapsed().as_secs_f64());

        tracing::debug!(events = events.len(), "Analytics report built");
        Ok(report)
    }

    /// The registration deadline of an event, if it has one.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown event.
    pub async fn registration_deadline(&self, id: EventId) -> Result<Option<DateTime<Utc>>> {
        Ok(self.load(id).await?.registration_deadline)
    }
}
