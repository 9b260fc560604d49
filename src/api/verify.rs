// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verification endpoints.
//!
//! Handlers wrap the verifier with the collaborators it deliberately does not
//! own: per-key rate limiting before verification, and audit plus logging
//! after it.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use tracing::{error, info, warn};

use crate::{
    audit_log,
    error::ApiError,
    models::{VerifyLinkRequest, VerifyRequest, VerifySuccessResponse},
    protocol::{decode_link, RawAuthorizationRecord},
    state::AppState,
    storage::{AuditEvent, AuditEventType},
    verification::{ErrorKind, Rejection, Submission, Verdict},
};

/// What is known about a request before verification, for audit purposes.
struct Submitted {
    public_key: String,
    nonce: Option<String>,
    domain: Option<String>,
}

impl Submitted {
    fn new(public_key: &str, record: Option<&RawAuthorizationRecord>) -> Self {
        Self {
            public_key: public_key.trim().to_string(),
            nonce: record.and_then(|r| r.nonce.clone()),
            domain: record.and_then(|r| r.domain.clone()),
        }
    }

    fn event(&self, event_type: AuditEventType) -> AuditEvent {
        let mut event = AuditEvent::new(event_type).with_public_key(&self.public_key);
        if let Some(nonce) = &self.nonce {
            event = event.with_nonce(nonce);
        }
        if let Some(domain) = &self.domain {
            event = event.with_domain(domain);
        }
        event
    }
}

fn enforce_rate_limit(state: &AppState, submitted: &Submitted) -> Result<(), ApiError> {
    if state.rate_limiter.check(&submitted.public_key) {
        return Ok(());
    }
    warn!(public_key = %submitted.public_key, "Verification rate limit exceeded");
    audit_log!(
        state.audit,
        submitted
            .event(AuditEventType::RateLimited)
            .failed(ErrorKind::RateLimited.as_str(), "rate limit exceeded")
    );
    Err(ApiError::rate_limited())
}

fn reject(state: &AppState, submitted: &Submitted, rejection: &Rejection) -> ApiError {
    let event_type = match rejection.code() {
        ErrorKind::ReplayedNonce => {
            warn!(
                nonce = submitted.nonce.as_deref().unwrap_or("-"),
                public_key = %submitted.public_key,
                "Replayed nonce rejected"
            );
            AuditEventType::ReplayDetected
        }
        ErrorKind::StoreUnavailable => {
            // A timed-out redis SET may still land, so a retry of the same
            // record can come back as a replay without any attack.
            error!(
                error = %rejection,
                nonce = submitted.nonce.as_deref().unwrap_or("-"),
                "Nonce store unavailable, failing closed; a retry of this nonce may report REPLAYED_NONCE"
            );
            AuditEventType::StoreUnavailable
        }
        code => {
            info!(code = %code, reason = %rejection, "Verification rejected");
            AuditEventType::VerificationRejected
        }
    };

    audit_log!(
        state.audit,
        submitted
            .event(event_type)
            .failed(rejection.code().as_str(), rejection.to_string())
    );
    ApiError::from(rejection)
}

fn respond(
    state: &AppState,
    submitted: &Submitted,
    verdict: Verdict,
) -> Result<Json<VerifySuccessResponse>, ApiError> {
    match verdict {
        Verdict::Valid {
            record,
            verified_at,
        } => {
            info!(
                nonce = %record.nonce(),
                domain = record.domain(),
                token = record.token(),
                amount = %record.amount(),
                memo = %record.display_memo(),
                "Authorization verified"
            );
            audit_log!(
                state.audit,
                AuditEvent::new(AuditEventType::VerificationSucceeded)
                    .with_nonce(record.nonce().as_str())
                    .with_public_key(&submitted.public_key)
                    .with_domain(record.domain())
            );
            Ok(Json(VerifySuccessResponse {
                success: true,
                verified: true,
                verified_at,
                nonce: record.nonce().to_string(),
            }))
        }
        Verdict::Invalid { reason } => Err(reject(state, submitted, &reason)),
    }
}

/// Verify a detached signature over an authorization record.
///
/// A successful verification consumes the record's nonce.
#[utoipa::path(
    post,
    path = "/v1/signatures/verify",
    request_body = VerifyRequest,
    tag = "Verification",
    responses(
        (status = 200, description = "Authorization is valid", body = VerifySuccessResponse),
        (status = 400, description = "Malformed input, unsupported version or business rule violation", body = crate::error::ErrorBody),
        (status = 401, description = "Expired, untrusted domain or bad signature", body = crate::error::ErrorBody),
        (status = 409, description = "Nonce already consumed", body = crate::error::ErrorBody),
        (status = 429, description = "Rate limited", body = crate::error::ErrorBody),
        (status = 503, description = "Nonce store unavailable", body = crate::error::ErrorBody)
    )
)]
pub async fn verify_signature(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifySuccessResponse>, ApiError> {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => {
            let err = ApiError::from(rejection);
            info!(error = %err.message, "Rejected unparseable verification request");
            return Err(err);
        }
    };

    let submitted = Submitted::new(&request.public_key, Some(&request.signature_data));
    enforce_rate_limit(&state, &submitted)?;

    let verdict = state
        .verifier
        .verify_submission(Submission {
            record: request.signature_data,
            signature: request.signature,
            public_key: request.public_key,
        })
        .await;

    respond(&state, &submitted, verdict)
}

/// Decode a payment link and verify it.
#[utoipa::path(
    post,
    path = "/v1/links/verify",
    request_body = VerifyLinkRequest,
    tag = "Verification",
    responses(
        (status = 200, description = "Authorization is valid", body = VerifySuccessResponse),
        (status = 400, description = "Malformed link or record", body = crate::error::ErrorBody),
        (status = 401, description = "Expired, untrusted domain or bad signature", body = crate::error::ErrorBody),
        (status = 409, description = "Nonce already consumed", body = crate::error::ErrorBody),
        (status = 429, description = "Rate limited", body = crate::error::ErrorBody),
        (status = 503, description = "Nonce store unavailable", body = crate::error::ErrorBody)
    )
)]
pub async fn verify_link(
    State(state): State<AppState>,
    payload: Result<Json<VerifyLinkRequest>, JsonRejection>,
) -> Result<Json<VerifySuccessResponse>, ApiError> {
    let Json(request) = payload.map_err(ApiError::from)?;

    let decoded = match decode_link(&request.link) {
        Ok(decoded) => decoded,
        Err(e) => {
            let submitted = Submitted::new(&request.public_key, None);
            enforce_rate_limit(&state, &submitted)?;
            return Err(reject(&state, &submitted, &Rejection::from(e)));
        }
    };

    let submitted = Submitted::new(&request.public_key, Some(&decoded.record));
    enforce_rate_limit(&state, &submitted)?;

    let verdict = state
        .verifier
        .verify_submission(Submission {
            record: decoded.record,
            signature: decoded.signature,
            public_key: request.public_key,
        })
        .await;

    respond(&state, &submitted, verdict)
}
