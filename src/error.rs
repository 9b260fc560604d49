// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::verification::{ErrorKind, Rejection};

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: ErrorKind,
    pub message: String,
}

/// Failure body: `{success: false, error, code}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: ErrorKind,
}

impl ApiError {
    pub fn new(code: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: code.status_code(),
            code,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedInput, message)
    }

    pub fn rate_limited() -> Self {
        Self::new(ErrorKind::RateLimited, "Too many verification requests")
    }

    pub fn store_unavailable() -> Self {
        Self::new(
            ErrorKind::StoreUnavailable,
            "Verification is temporarily unavailable",
        )
    }
}

impl From<&Rejection> for ApiError {
    fn from(rejection: &Rejection) -> Self {
        Self::new(rejection.public_code(), rejection.public_message())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::malformed(format!("Malformed input: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            success: false,
            error: self.message,
            code: self.code,
        });
        (self.status, body).into_response()
    }
}
