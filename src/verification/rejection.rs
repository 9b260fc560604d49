// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Rejection taxonomy.
//!
//! [`Rejection`] keeps the full internal detail for logs and audit events.
//! Callers only ever see [`Rejection::public_code`] and
//! [`Rejection::public_message`], which collapse the identity checks so a
//! response cannot be used as an oracle for which key check failed.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::protocol::{LinkError, ShapeError};

/// Externally visible error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    MalformedInput,
    UnsupportedVersion,
    Expired,
    InvalidTimestamp,
    UntrustedDomain,
    ReplayedNonce,
    BadSignature,
    KeyMismatch,
    BusinessRuleViolation,
    StoreUnavailable,
    RateLimited,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "MALFORMED_INPUT",
            ErrorKind::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorKind::Expired => "EXPIRED",
            ErrorKind::InvalidTimestamp => "INVALID_TIMESTAMP",
            ErrorKind::UntrustedDomain => "UNTRUSTED_DOMAIN",
            ErrorKind::ReplayedNonce => "REPLAYED_NONCE",
            ErrorKind::BadSignature => "BAD_SIGNATURE",
            ErrorKind::KeyMismatch => "KEY_MISMATCH",
            ErrorKind::BusinessRuleViolation => "BUSINESS_RULE_VIOLATION",
            ErrorKind::StoreUnavailable => "STORE_UNAVAILABLE",
            ErrorKind::RateLimited => "RATE_LIMITED",
        }
    }

    /// HTTP status for this code.
    ///
    /// | Code | Status |
    /// |------|--------|
    /// | input and business rule problems | 400 |
    /// | time, domain and signature failures | 401 |
    /// | replay | 409 |
    /// | rate limit | 429 |
    /// | store failure | 503 |
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::MalformedInput
            | ErrorKind::UnsupportedVersion
            | ErrorKind::BusinessRuleViolation => StatusCode::BAD_REQUEST,
            ErrorKind::Expired
            | ErrorKind::InvalidTimestamp
            | ErrorKind::UntrustedDomain
            | ErrorKind::BadSignature
            | ErrorKind::KeyMismatch => StatusCode::UNAUTHORIZED,
            ErrorKind::ReplayedNonce => StatusCode::CONFLICT,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a timestamp pair was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampIssue {
    /// `timestamp` lies beyond the allowed clock skew.
    InFuture,
    /// `expiry <= timestamp`.
    ExpiryBeforeCreation,
    /// `expiry - timestamp` exceeds the maximum validity window.
    WindowTooLong,
}

impl std::fmt::Display for TimestampIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TimestampIssue::InFuture => "timestamp is in the future",
            TimestampIssue::ExpiryBeforeCreation => "expiry is not after timestamp",
            TimestampIssue::WindowTooLong => "validity window is too long",
        })
    }
}

/// Business rule sub-reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusinessRule {
    NonPositiveAmount,
    AmountAboveCeiling,
    ExcessPrecision,
    UnsupportedToken,
    SameSourceAndDestination,
    SlippageOutOfRange,
    InvalidAddress,
}

impl BusinessRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessRule::NonPositiveAmount => "NON_POSITIVE_AMOUNT",
            BusinessRule::AmountAboveCeiling => "AMOUNT_ABOVE_CEILING",
            BusinessRule::ExcessPrecision => "EXCESS_PRECISION",
            BusinessRule::UnsupportedToken => "UNSUPPORTED_TOKEN",
            BusinessRule::SameSourceAndDestination => "SAME_SOURCE_AND_DESTINATION",
            BusinessRule::SlippageOutOfRange => "SLIPPAGE_OUT_OF_RANGE",
            BusinessRule::InvalidAddress => "INVALID_ADDRESS",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            BusinessRule::NonPositiveAmount => "amount must be greater than zero",
            BusinessRule::AmountAboveCeiling => "amount exceeds the limit for this token",
            BusinessRule::ExcessPrecision => "amount has more decimals than the token supports",
            BusinessRule::UnsupportedToken => "token is not supported",
            BusinessRule::SameSourceAndDestination => "source and destination must differ",
            BusinessRule::SlippageOutOfRange => "maxSlippage must be between 0 and 0.1",
            BusinessRule::InvalidAddress => "address is not a valid ledger address",
        }
    }
}

impl std::fmt::Display for BusinessRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed verification, with internal detail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("unsupported version: {0}")]
    UnsupportedVersion(String),

    #[error("expired at {expiry} (now {now})")]
    Expired { expiry: i64, now: i64 },

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(TimestampIssue),

    #[error("untrusted domain: {0}")]
    UntrustedDomain(String),

    #[error("nonce already consumed: {0}")]
    ReplayedNonce(String),

    #[error("signature verification failed")]
    BadSignature,

    #[error("source {source_address} does not match public key {public_key}")]
    KeyMismatch {
        source_address: String,
        public_key: String,
    },

    #[error("business rule violated: {0}")]
    BusinessRule(BusinessRule),

    #[error("nonce store unavailable: {0}")]
    StoreUnavailable(String),
}

impl Rejection {
    /// Internal code, used in logs and audit events.
    pub fn code(&self) -> ErrorKind {
        match self {
            Rejection::MalformedInput(_) => ErrorKind::MalformedInput,
            Rejection::UnsupportedVersion(_) => ErrorKind::UnsupportedVersion,
            Rejection::Expired { .. } => ErrorKind::Expired,
            Rejection::InvalidTimestamp(_) => ErrorKind::InvalidTimestamp,
            Rejection::UntrustedDomain(_) => ErrorKind::UntrustedDomain,
            Rejection::ReplayedNonce(_) => ErrorKind::ReplayedNonce,
            Rejection::BadSignature => ErrorKind::BadSignature,
            Rejection::KeyMismatch { .. } => ErrorKind::KeyMismatch,
            Rejection::BusinessRule(_) => ErrorKind::BusinessRuleViolation,
            Rejection::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }

    /// Code reported to callers. Identity failures share one code.
    pub fn public_code(&self) -> ErrorKind {
        match self.code() {
            ErrorKind::KeyMismatch => ErrorKind::BadSignature,
            other => other,
        }
    }

    /// Message reported to callers.
    pub fn public_message(&self) -> String {
        match self {
            Rejection::MalformedInput(detail) => format!("Malformed input: {detail}"),
            Rejection::UnsupportedVersion(version) => {
                format!("Unsupported protocol version: {version}")
            }
            Rejection::Expired { .. } => "Authorization has expired".to_string(),
            Rejection::InvalidTimestamp(issue) => format!("Invalid timestamp: {issue}"),
            Rejection::UntrustedDomain(_) => "Domain is not trusted".to_string(),
            Rejection::ReplayedNonce(_) => "Authorization has already been used".to_string(),
            Rejection::BadSignature | Rejection::KeyMismatch { .. } => {
                "Signature verification failed".to_string()
            }
            Rejection::BusinessRule(rule) => format!("{}: {}", rule.as_str(), rule.message()),
            Rejection::StoreUnavailable(_) => {
                "Verification is temporarily unavailable".to_string()
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.public_code().status_code()
    }

    /// Sub-reason for business rule violations.
    pub fn business_rule(&self) -> Option<BusinessRule> {
        match self {
            Rejection::BusinessRule(rule) => Some(*rule),
            _ => None,
        }
    }
}

impl From<ShapeError> for Rejection {
    fn from(err: ShapeError) -> Self {
        Rejection::MalformedInput(err.to_string())
    }
}

impl From<LinkError> for Rejection {
    fn from(err: LinkError) -> Self {
        Rejection::MalformedInput(err.to_string())
    }
}

impl From<BusinessRule> for Rejection {
    fn from(rule: BusinessRule) -> Self {
        Rejection::BusinessRule(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_mismatch_is_reported_as_bad_signature() {
        let mismatch = Rejection::KeyMismatch {
            source_address: "A".to_string(),
            public_key: "B".to_string(),
        };
        assert_eq!(mismatch.code(), ErrorKind::KeyMismatch);
        assert_eq!(mismatch.public_code(), ErrorKind::BadSignature);
        assert_eq!(mismatch.public_message(), Rejection::BadSignature.public_message());
        assert_eq!(mismatch.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            Rejection::MalformedInput("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Rejection::ReplayedNonce("n".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            Rejection::StoreUnavailable("timeout".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            Rejection::BusinessRule(BusinessRule::AmountAboveCeiling).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Rejection::Expired { expiry: 1, now: 2 }.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ErrorKind::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn public_messages_hide_internal_detail() {
        let store = Rejection::StoreUnavailable("redb commit error: disk full".into());
        assert!(!store.public_message().contains("redb"));

        let domain = Rejection::UntrustedDomain("evil.example".into());
        assert!(!domain.public_message().contains("evil"));
    }

    #[test]
    fn codes_serialize_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorKind::BusinessRuleViolation).unwrap();
        assert_eq!(json, "\"BUSINESS_RULE_VIOLATION\"");
        assert_eq!(ErrorKind::ReplayedNonce.to_string(), "REPLAYED_NONCE");
    }

    #[test]
    fn business_rule_message_names_sub_reason() {
        let rejection = Rejection::from(BusinessRule::SameSourceAndDestination);
        assert!(rejection
            .public_message()
            .starts_with("SAME_SOURCE_AND_DESTINATION"));
        assert_eq!(
            rejection.business_rule(),
            Some(BusinessRule::SameSourceAndDestination)
        );
    }
}
