//! Shared state handed to every handler.

use crate::service::EventService;
use eventgate_postgres::PostgresRecordStore;
use metrics_exporter_prometheus::PrometheusHandle;
use std::time::Duration;

/// Application state.
///
/// Cheap to clone: the service holds its store and clock behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// Command layer
    pub service: EventService,
    /// Tick period for countdown streams
    pub countdown_period: Duration,
    /// Prometheus renderer, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
    /// Database handle for readiness probes, when running on `PostgreSQL`
    pub postgres: Option<PostgresRecordStore>,
}

impl AppState {
    /// State with no metrics and no database probe
    #[must_use]
    pub const fn new(service: EventService, countdown_period: Duration) -> Self {
        Self {
            service,
            countdown_period,
            metrics: None,
            postgres: None,
        }
    }

    /// Attach a Prometheus handle
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Attach the `PostgreSQL` store for readiness checks
    #[must_use]
    pub fn with_postgres(mut self, store: PostgresRecordStore) -> Self {
        self.postgres = Some(store);
        self
    }
}
