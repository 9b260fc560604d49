// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. Field names are camelCase on
//! the wire to match the link payload and browser wallet clients.
//!
//! ## Model Categories
//!
//! - **Verification**: signature and link verification requests and results
//! - **Nonces**: diagnostic nonce status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::protocol::RawAuthorizationRecord;
use crate::storage::ConsumedRecord;

// =============================================================================
// Verification
// =============================================================================

/// Verify a detached signature over an authorization record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// The signed record.
    pub signature_data: RawAuthorizationRecord,
    /// Ed25519 signature over the canonical encoding (base58).
    pub signature: String,
    /// Public key claimed by the caller (base58); must equal `source`.
    pub public_key: String,
}

/// Verify a payment link as produced by a signer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyLinkRequest {
    /// Origin-relative or absolute link carrying `d`, `s` and `v`.
    pub link: String,
    pub public_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifySuccessResponse {
    pub success: bool,
    pub verified: bool,
    pub verified_at: DateTime<Utc>,
    /// The nonce consumed by this verification.
    pub nonce: String,
}

// =============================================================================
// Nonces
// =============================================================================

/// Diagnostic status of a nonce. Never use this to authorize anything.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NonceStatusResponse {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<ConsumedRecord>,
}
