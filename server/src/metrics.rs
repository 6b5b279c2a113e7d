//! Prometheus metrics for the eventgate server.
//!
//! Descriptions are registered once at startup; the recording helpers are
//! called from the command layer.
//!
//! Metrics exposed:
//! - `eventgate_registrations_total{outcome}`
//! - `eventgate_cancellations_total`
//! - `eventgate_attendance_updates_total{attended}`
//! - `eventgate_completions_total{transition}`
//! - `eventgate_events_created_total`
//! - `eventgate_reviews_total{action}`
//! - `eventgate_certificates_issued_total`
//! - `eventgate_certificate_verifications_total{result}`
//! - `eventgate_analytics_query_duration_seconds`
//! - `eventgate_store_conflicts_total{operation}` (recorded by the store)

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Install the Prometheus recorder and register metric descriptions.
///
/// The returned handle renders the scrape body for `/metrics`.
///
/// # Errors
///
/// Returns [`MetricsError`] if the exporter cannot be built or a recorder is
/// already installed.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    register_metrics();
    Ok(handle)
}

fn register_metrics() {
    describe_counter!(
        "eventgate_registrations_total",
        "Registration attempts by outcome (reserved, denied, conflict)"
    );
    describe_counter!(
        "eventgate_cancellations_total",
        "Registrations cancelled by their actor"
    );
    describe_counter!(
        "eventgate_attendance_updates_total",
        "Attendance flags written by organizers"
    );
    describe_counter!(
        "eventgate_completions_total",
        "Completion requests by transition (completed, already_completed)"
    );
    describe_counter!("eventgate_events_created_total", "Events created");
    describe_counter!(
        "eventgate_reviews_total",
        "Review writes by action (submitted, updated, deleted)"
    );
    describe_counter!(
        "eventgate_certificates_issued_total",
        "Certificates issued for the first time"
    );
    describe_counter!(
        "eventgate_certificate_verifications_total",
        "Certificate verification lookups by result"
    );
    describe_counter!(
        "eventgate_store_conflicts_total",
        "Writes refused inside the store's atomic section"
    );
    describe_histogram!(
        "eventgate_analytics_query_duration_seconds",
        "Time taken to build an analytics report"
    );
}

/// Outcome label for a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A place was reserved
    Reserved,
    /// Refused by the advisory pre-check
    Denied,
    /// Passed the pre-check, lost inside the store
    Conflict,
}

impl RegistrationOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Reserved => "reserved",
            Self::Denied => "denied",
            Self::Conflict => "conflict",
        }
    }
}

/// Record a registration attempt
pub fn record_registration(outcome: RegistrationOutcome) {
    counter!("eventgate_registrations_total", "outcome" => outcome.as_str()).increment(1);
}

/// Record a cancellation
pub fn record_cancellation() {
    counter!("eventgate_cancellations_total").increment(1);
}

/// Record an attendance update
pub fn record_attendance(attended: bool) {
    counter!("eventgate_attendance_updates_total", "attended" => attended.to_string()).increment(1);
}

/// Record a completion request
pub fn record_completion(transition: &'static str) {
    counter!("eventgate_completions_total", "transition" => transition).increment(1);
}

/// Record an event creation
pub fn record_event_created() {
    counter!("eventgate_events_created_total").increment(1);
}

/// Record a review write
pub fn record_review(action: &'static str) {
    counter!("eventgate_reviews_total", "action" => action).increment(1);
}

/// Record a newly issued certificate
pub fn record_certificate_issued() {
    counter!("eventgate_certificates_issued_total").increment(1);
}

/// Record a verification lookup
pub fn record_certificate_verification(valid: bool) {
    let result = if valid { "valid" } else { "invalid" };
    counter!("eventgate_certificate_verifications_total", "result" => result).increment(1);
}

/// Record analytics report latency
pub fn record_analytics_query(seconds: f64) {
    histogram!("eventgate_analytics_query_duration_seconds").record(seconds);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(RegistrationOutcome::Reserved.as_str(), "reserved");
        assert_eq!(RegistrationOutcome::Denied.as_str(), "denied");
        assert_eq!(RegistrationOutcome::Conflict.as_str(), "conflict");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        // No recorder installed: the macros fall back to the no-op recorder.
        record_registration(RegistrationOutcome::Reserved);
        record_certificate_verification(false);
        record_analytics_query(0.002);
    }
}
