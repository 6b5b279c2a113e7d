//! HTTP handlers.
//!
//! Handlers stay thin: extract, call [`crate::service::EventService`], map the
//! result. Every error goes through [`error::AppError`].

pub mod actor;
pub mod analytics;
pub mod certificates;
pub mod countdown;
pub mod error;
pub mod events;
pub mod notifications;
pub mod registrations;
pub mod reviews;

pub use actor::ActorHeader;
pub use error::AppError;
