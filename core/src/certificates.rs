//! Certificate issuance and verification.
//!
//! The engine decides eligibility and answers verification lookups. Rendering
//! the certificate document happens elsewhere.

use crate::attendance::is_certificate_eligible;
use crate::error::{Denial, StoreError};
use crate::store::{CertificateStore, EventRecordStore};
use crate::types::{Certificate, CertificateId, Event, EventId, Registration};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Builds a certificate for an eligible registration.
///
/// Storing it is the caller's job; the store returns the existing certificate
/// if the pair already has one.
///
/// # Errors
///
/// [`Denial::NotCompleted`] or [`Denial::NotAttended`] when not eligible.
pub fn issue(
    event: &Event,
    registration: &Registration,
    holder_name: &str,
    now: DateTime<Utc>,
) -> Result<Certificate, Denial> {
    if !event.is_completed {
        return Err(Denial::NotCompleted);
    }
    if !is_certificate_eligible(event, registration) {
        return Err(Denial::NotAttended);
    }

    Ok(Certificate {
        certificate_id: CertificateId::new(),
        event_id: event.id,
        actor_id: registration.actor_id,
        holder_name: holder_name.trim().to_string(),
        issued_at: now,
        revoked: false,
    })
}

/// Event metadata shown next to a verified certificate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertifiedEvent {
    /// Event id
    pub id: EventId,
    /// Event title
    pub title: String,
    /// Event start
    pub date: DateTime<Utc>,
}

/// Answer to a verification lookup. `valid == false` is a normal answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateVerification {
    /// Whether the certificate exists, is not revoked and its event is known
    pub valid: bool,
    /// Event metadata, present only when valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<CertifiedEvent>,
    /// Holder name, present only when valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,
    /// Issue time, present only when valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
}

impl CertificateVerification {
    /// The "no" answer
    pub const INVALID: Self = Self {
        valid: false,
        event: None,
        holder: None,
        issued_at: None,
    };
}

/// Resolves a raw certificate id.
///
/// Malformed, unknown and revoked ids all verify as invalid. So does a
/// certificate whose event no longer exists.
///
/// # Errors
///
/// Only [`StoreError::Transport`] (or an unexpected `Conflict`) propagates.
pub async fn verify<S>(store: &S, raw_id: &str) -> Result<CertificateVerification, StoreError>
where
    S: CertificateStore + EventRecordStore + ?Sized,
{
    let Some(id) = CertificateId::parse(raw_id) else {
        tracing::debug!(raw_id, "Certificate id is not a UUID");
        return Ok(CertificateVerification::INVALID);
    };

    let certificate = match store.find_certificate(id).await? {
        Some(certificate) if !certificate.revoked => certificate,
        Some(_) => {
            tracing::debug!(certificate_id = %id, "Certificate is revoked");
            return Ok(CertificateVerification::INVALID);
        }
        None => return Ok(CertificateVerification::INVALID),
    };

    let event = match store.load_event(certificate.event_id).await {
        Ok(event) => event,
        Err(StoreError::NotFound { .. }) => {
            tracing::warn!(
                certificate_id = %id,
                event_id = %certificate.event_id,
                "Certificate refers to an unknown event"
            );
            return Ok(CertificateVerification::INVALID);
        }
        Err(error) => return Err(error),
    };

    Ok(CertificateVerification {
        valid: true,
        event: Some(CertifiedEvent {
            id: event.id,
            title: event.title,
            date: event.date,
        }),
        holder: Some(certificate.holder_name),
        issued_at: Some(certificate.issued_at),
    })
}
