//! Acting-actor extractor.
//!
//! Authentication happens upstream. The gateway forwards the authenticated
//! actor in `x-actor-id`, plus the verification flags the permission resolver
//! needs.

use super::error::AppError;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use eventgate_core::types::{Actor, ActorId, ActorVerification};

/// Header carrying the acting actor's id
pub const ACTOR_HEADER: &str = "x-actor-id";
/// Header set to `true` once the actor's email is verified
pub const EMAIL_VERIFIED_HEADER: &str = "x-actor-email-verified";
/// Header set to `true` once the actor's phone is verified
pub const PHONE_VERIFIED_HEADER: &str = "x-actor-phone-verified";

/// The acting actor, taken from request headers.
///
/// Rejects with 401 when `x-actor-id` is missing or not a UUID.
#[derive(Debug, Clone, Copy)]
pub struct ActorHeader(pub Actor);

impl ActorHeader {
    /// The actor's id
    #[must_use]
    pub const fn id(&self) -> ActorId {
        self.0.id
    }
}

fn flag(headers: &HeaderMap, name: &str) -> bool {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| matches!(value.trim(), "true" | "1" | "yes"))
}

#[async_trait]
impl<S> FromRequestParts<S> for ActorHeader
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized(format!("Missing {ACTOR_HEADER} header")))?;

        let id = ActorId::parse(raw)
            .ok_or_else(|| AppError::unauthorized(format!("Invalid {ACTOR_HEADER} header")))?;

        let verification = ActorVerification {
            email_verified: flag(&parts.headers, EMAIL_VERIFIED_HEADER),
            phone_verified: flag(&parts.headers, PHONE_VERIFIED_HEADER),
        };

        Ok(Self(Actor::new(id, verification)))
    }
}
