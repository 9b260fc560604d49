// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::error;

use crate::{
    error::ApiError, models::NonceStatusResponse, protocol::Nonce, state::AppState,
};

/// Diagnostic lookup of a nonce. Read-only; never used to authorize.
#[utoipa::path(
    get,
    path = "/v1/nonces/{nonce}",
    params(("nonce" = String, Path, description = "Nonce (base64url, unpadded)")),
    tag = "Nonces",
    responses(
        (status = 200, body = NonceStatusResponse),
        (status = 400, description = "Not a well-formed nonce", body = crate::error::ErrorBody),
        (status = 503, description = "Nonce store unavailable", body = crate::error::ErrorBody)
    )
)]
pub async fn nonce_status(
    State(state): State<AppState>,
    Path(nonce): Path<String>,
) -> Result<Json<NonceStatusResponse>, ApiError> {
    let nonce = Nonce::parse(&nonce).map_err(|e| ApiError::malformed(e.to_string()))?;

    let timeout = state.verifier.config().store_timeout;
    let info = match tokio::time::timeout(timeout, state.nonce_store.info(nonce.as_str())).await {
        Ok(Ok(info)) => info,
        Ok(Err(e)) => {
            error!(error = %e, "Nonce status lookup failed");
            return Err(ApiError::store_unavailable());
        }
        Err(_) => {
            error!("Nonce status lookup timed out");
            return Err(ApiError::store_unavailable());
        }
    };

    Ok(Json(NonceStatusResponse {
        exists: info.is_some(),
        info,
    }))
}
