//! HTTP command layer for the eventgate engine.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Imperative Shell (axum)         │  ← headers, JSON, SSE
//! │  api::*  →  service::EventService       │  ← load, pre-check, store, notify
//! ├─────────────────────────────────────────┤
//! │         eventgate-core                  │  ← pure decisions over snapshots
//! ├─────────────────────────────────────────┤
//! │         RecordStore                     │  ← atomic check-and-reserve
//! │  (in-memory or PostgreSQL)              │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Request flow
//!
//! 1. The handler extracts the acting actor and path parameters
//! 2. [`service::EventService`] loads the event snapshot
//! 3. The engine runs the advisory check and returns a precise denial if it fails
//! 4. The store re-runs the check atomically and applies the change
//! 5. Notifications are appended to the affected actors' feeds
//! 6. [`api::AppError`] maps any [`eventgate_core::EngineError`] to a status code

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod countdown;
pub mod metrics;
pub mod server;
pub mod service;

pub use config::Config;
pub use server::{AppState, build_router};
pub use service::EventService;
