// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;
use crate::storage::StoreScope;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall status: "ok", "degraded" (process-local nonce store) or
    /// "unavailable".
    pub status: String,
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Nonce store reachability ("ok" or "unavailable").
    pub nonce_store: String,
    /// Reach of replay protection. `process-local` and `durable-local` mean
    /// replays against another instance go undetected.
    pub nonce_store_scope: StoreScope,
    /// Whether more than one verifier instance may share this nonce store.
    pub multi_instance_safe: bool,
    /// Data directory availability (durable mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

fn check_data_dir(state: &AppState) -> Option<String> {
    state.data_dir.as_ref().map(|dir| {
        let status = if dir.exists() { "ok" } else { "missing" };
        status.to_string()
    })
}

/// Health check endpoint handler.
///
/// Returns 200 when the nonce store answers (status "degraded" if it is only
/// process-local), 503 otherwise.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Service is unhealthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let scope = state.nonce_store.scope();
    let timeout = state.verifier.config().store_timeout;
    let store_ok = matches!(
        tokio::time::timeout(timeout, state.nonce_store.ping()).await,
        Ok(Ok(()))
    );
    let data_dir = check_data_dir(&state);
    let data_ok = data_dir.as_deref().map(|s| s == "ok").unwrap_or(true);

    let status = match (store_ok && data_ok, scope.is_degraded()) {
        (false, _) => "unavailable",
        (true, true) => "degraded",
        (true, false) => "ok",
    };

    let response = ReadyResponse {
        status: status.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            nonce_store: if store_ok { "ok" } else { "unavailable" }.to_string(),
            nonce_store_scope: scope,
            multi_instance_safe: scope.is_shared(),
            data_dir,
        },
    };

    let code = if store_ok && data_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(response))
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
///
/// Same checks as `/health`: not ready while the nonce store is unreachable,
/// since every verification would fail closed.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}
