//! Error taxonomy.
//!
//! - **Policy denials** are expected outcomes. The pure functions return them as
//!   data ([`crate::admission::AdmissionDecision`], [`crate::permissions::PermissionSet`]);
//!   the command layer lifts them into [`EngineError::PolicyDenied`] so a caller
//!   can render "you can't do this because X".
//! - **Conflict** is a lost race at the store layer and is retryable.
//! - **`NotFound`** is an unknown entity. A certificate that fails verification is
//!   *not* `NotFound`, it is a successful "no".
//! - **Transport** is the only class that represents real failure.

use crate::admission::ClosedReason;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a policy check said no.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Denial {
    /// Event is not published
    Unpublished,
    /// Registration deadline passed
    DeadlinePassed,
    /// No places left
    CapacityFull,
    /// Actor already holds an active registration
    AlreadyRegistered,
    /// Actor holds no active registration
    NotRegistered,
    /// Only the organizer may do this
    NotOrganizer,
    /// Event has not been marked completed
    NotCompleted,
    /// Actor was not marked as attended
    NotAttended,
    /// Actor failed the email/phone verification gate
    Unverified,
}

impl Denial {
    /// Stable machine-readable code
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unpublished => "unpublished",
            Self::DeadlinePassed => "deadline_passed",
            Self::CapacityFull => "capacity_full",
            Self::AlreadyRegistered => "already_registered",
            Self::NotRegistered => "not_registered",
            Self::NotOrganizer => "not_organizer",
            Self::NotCompleted => "not_completed",
            Self::NotAttended => "not_attended",
            Self::Unverified => "unverified",
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::Unpublished => "the event is not published",
            Self::DeadlinePassed => "the registration deadline has passed",
            Self::CapacityFull => "the event is full",
            Self::AlreadyRegistered => "you are already registered for this event",
            Self::NotRegistered => "you are not registered for this event",
            Self::NotOrganizer => "only the event organizer can do this",
            Self::NotCompleted => "the event has not been completed yet",
            Self::NotAttended => "your attendance has not been confirmed",
            Self::Unverified => "verify your email and phone number first",
        };
        f.write_str(message)
    }
}

impl From<ClosedReason> for Denial {
    fn from(reason: ClosedReason) -> Self {
        match reason {
            ClosedReason::Unpublished => Self::Unpublished,
            ClosedReason::DeadlinePassed => Self::DeadlinePassed,
            ClosedReason::CapacityFull => Self::CapacityFull,
        }
    }
}

/// Errors raised by record store implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Kind of record (`event`, `registration`, `review`...)
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// A concurrent writer won; the command may be retried against a fresh snapshot.
    #[error("Concurrency conflict: {0}")]
    Conflict(String),

    /// Storage unreachable, timed out, or returned garbage.
    #[error("Storage error: {0}")]
    Transport(String),
}

impl StoreError {
    /// Shorthand for a `NotFound` on any displayable id
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// A policy check that passed on the caller's snapshot failed inside the
    /// store's atomic section.
    #[must_use]
    pub fn lost_race(denial: Denial) -> Self {
        Self::Conflict(format!("{} ({denial})", denial.as_str()))
    }
}

/// Errors surfaced by the command layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The action is not permitted right now.
    #[error("Not allowed: {0}")]
    PolicyDenied(Denial),

    /// Lost a race at the store layer. Retryable.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown event, actor, review or certificate.
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Kind of record
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Input failed validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Storage failure.
    #[error("Transport failure: {0}")]
    Transport(String),
}

impl EngineError {
    /// Whether retrying the same command may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Transport(_))
    }

    /// Shorthand for a `NotFound` on any displayable id
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<Denial> for EngineError {
    fn from(denial: Denial) -> Self {
        Self::PolicyDenied(denial)
    }
}

impl From<StoreError> for EngineError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::Conflict(message) => Self::Conflict(message),
            StoreError::Transport(message) => Self::Transport(message),
        }
    }
}

/// Convenience alias for command-layer results
pub type Result<T> = std::result::Result<T, EngineError>;
