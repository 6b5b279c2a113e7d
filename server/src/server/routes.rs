//! Router configuration.

use super::health::{health_check, metrics, readiness_check};
use super::state::AppState;
use crate::api::{analytics, certificates, countdown, events, notifications, registrations, reviews};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Build the complete router.
///
/// Probes and `/metrics` sit at the root; everything else is under `/api`.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Events
        .route("/events", post(events::create_event).get(events::list_events))
        .route("/events/:id", get(events::get_event))
        .route("/events/:id/publish", post(events::publish_event))
        .route("/events/:id/permissions", get(events::get_permissions))
        .route("/events/:id/countdown", get(countdown::countdown))
        // Registrations, attendance, completion
        .route("/events/:id/register", post(registrations::register))
        .route("/events/:id/cancel", post(registrations::cancel))
        .route(
            "/events/:id/registrations/:actor_id/attendance",
            put(registrations::set_attendance),
        )
        .route("/events/:id/complete", post(registrations::complete))
        // Reviews
        .route(
            "/events/:id/reviews",
            get(reviews::list_reviews)
                .post(reviews::submit_review)
                .put(reviews::update_review)
                .delete(reviews::delete_review),
        )
        // Certificates
        .route("/events/:id/certificates", post(certificates::issue_certificate))
        .route(
            "/certificates/verify/:certificate_id",
            get(certificates::verify_certificate),
        )
        // Notifications
        .route("/notifications", get(notifications::feed))
        .route("/notifications/reconcile", post(notifications::reconcile))
        // Analytics
        .route("/analytics", get(analytics::get_analytics));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .nest("/api", api_routes)
        .with_state(state)
}
