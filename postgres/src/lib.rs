//! `PostgreSQL` record store for the eventgate engine.
//!
//! Implements the store traits from `eventgate-core` over four tables. Events
//! are stored as JSONB documents with their registration history inline, the
//! same shape the engine works on, so a write is: lock the row, decode, run the
//! lifecycle function, encode, update.
//!
//! Capacity is enforced by `SELECT ... FOR UPDATE` inside a transaction: two
//! registrations racing for the last place serialize on the row lock and the
//! second one sees the first one's row.
//!
//! # Example
//!
//! ```no_run
//! use eventgate_postgres::PostgresRecordStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresRecordStore::connect("postgres://localhost/eventgate", 10).await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod records;

use eventgate_core::error::StoreError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// `PostgreSQL`-backed implementation of [`eventgate_core::RecordStore`].
#[derive(Clone, Debug)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with a pool of at most `max_connections`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Transport`] if the database is unreachable.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Transport(format!("Failed to connect: {e}")))?;

        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Transport`] if migrations fail.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Transport(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Round-trips a trivial query; used by readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Transport`] if the database does not answer.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(transport)?;
        Ok(())
    }

    /// The underlying pool
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Any database failure that is not a constraint violation.
fn transport(error: sqlx::Error) -> StoreError {
    StoreError::Transport(error.to_string())
}

/// Unique violations are lost races; everything else is transport.
fn classify(error: sqlx::Error, what: &str) -> StoreError {
    let unique = error
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique {
        metrics::counter!("eventgate_store_conflicts_total", "operation" => what.to_string()).increment(1);
        StoreError::Conflict(format!("{what} already exists"))
    } else {
        transport(error)
    }
}

fn decode<T: serde::de::DeserializeOwned>(json: serde_json::Value) -> Result<T, StoreError> {
    serde_json::from_value(json)
        .map_err(|e| StoreError::Transport(format!("Corrupt record document: {e}")))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value)
        .map_err(|e| StoreError::Transport(format!("Failed to encode record: {e}")))
}
