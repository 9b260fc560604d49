// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::ErrorBody,
    models::{NonceStatusResponse, VerifyLinkRequest, VerifyRequest, VerifySuccessResponse},
    protocol::RawAuthorizationRecord,
    state::AppState,
    storage::{ClaimMetadata, ConsumedRecord, StoreScope},
    verification::ErrorKind,
};

pub mod health;
pub mod nonces;
pub mod verify;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/signatures/verify", post(verify::verify_signature))
        .route("/links/verify", post(verify::verify_link))
        .route("/nonces/{nonce}", get(nonces::nonce_status));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        verify::verify_signature,
        verify::verify_link,
        nonces::nonce_status,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            VerifyRequest,
            VerifyLinkRequest,
            VerifySuccessResponse,
            NonceStatusResponse,
            RawAuthorizationRecord,
            ConsumedRecord,
            ClaimMetadata,
            StoreScope,
            ErrorBody,
            ErrorKind,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Verification", description = "Signed payment authorization verification"),
        (name = "Nonces", description = "Consumed nonce diagnostics"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
