//! Certificate endpoints.
//!
//! - `POST /api/events/:id/certificates` - issue the caller's certificate
//! - `GET /api/certificates/verify/:certificate_id` - public verification

use super::actor::ActorHeader;
use super::error::AppError;
use crate::server::state::AppState;
use crate::service::CertificateIssue;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use eventgate_core::certificates::CertificateVerification;
use eventgate_core::types::EventId;
use serde::Deserialize;

/// Body for certificate issuance.
#[derive(Debug, Deserialize)]
pub struct IssueCertificateRequest {
    /// Name printed on the certificate
    pub holder_name: String,
}

/// Issue (or re-fetch) the caller's certificate.
///
/// 201 on first issue, 200 when the certificate already existed.
///
/// # Errors
///
/// 403 `not_completed` / `not_attended` / `not_registered` when not eligible.
pub async fn issue_certificate(
    State(state): State<AppState>,
    actor: ActorHeader,
    Path(id): Path<EventId>,
    Json(request): Json<IssueCertificateRequest>,
) -> Result<(StatusCode, Json<CertificateIssue>), AppError> {
    let issue = state
        .service
        .issue_certificate(id, actor.id(), &request.holder_name)
        .await?;
    let status = if issue.newly_issued {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(issue)))
}

/// Verify a certificate id.
///
/// Always 200 for a lookup that completed; `valid: false` covers unknown,
/// revoked and malformed ids.
///
/// # Errors
///
/// 503 when the store is unavailable.
pub async fn verify_certificate(
    State(state): State<AppState>,
    Path(certificate_id): Path<String>,
) -> Result<Json<CertificateVerification>, AppError> {
    Ok(Json(state.service.verify_certificate(&certificate_id).await?))
}
