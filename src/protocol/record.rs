// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The signed authorization record.
//!
//! [`RawAuthorizationRecord`] is the loosely-typed JSON shape that arrives
//! from links and HTTP bodies. [`AuthorizationRecord`] is the validated,
//! immutable form; `TryFrom<RawAuthorizationRecord>` is its only constructor,
//! which is where `MALFORMED_INPUT` is decided. Optional fields are replaced
//! by their protocol defaults there, so "missing" and "default" can never be
//! encoded differently by signer and verifier.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::decimal::Decimal;
use super::types::{Address, Nonce, ShapeError, MAX_DOMAIN_CHARS};
use super::{DEFAULT_MAX_SLIPPAGE, MAX_MEMO_CHARS, MAX_SLIPPAGE_FRACTION_DIGITS, NATIVE_TOKEN};

/// Longest token symbol accepted.
const MAX_TOKEN_CHARS: usize = 16;

/// A decimal as it may appear in JSON: either a string or a plain number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecimalInput {
    Text(String),
    Number(serde_json::Number),
}

impl DecimalInput {
    fn parse(&self, field: &'static str) -> Result<Decimal, ShapeError> {
        let text = match self {
            DecimalInput::Text(s) => s.trim().to_string(),
            DecimalInput::Number(n) => n.to_string(),
        };
        text.parse::<Decimal>()
            .map_err(|e| ShapeError::invalid(field, e.to_string()))
    }
}

impl From<Decimal> for DecimalInput {
    fn from(value: Decimal) -> Self {
        DecimalInput::Text(value.to_string())
    }
}

/// Untyped authorization record as transported in JSON (camelCase keys).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawAuthorizationRecord {
    /// Single-use nonce (base64url, unpadded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Creation time, milliseconds since epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Expiry time, milliseconds since epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
    /// Origin the record was created for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Protocol version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Paying address (base58).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Receiving address (base58).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Positive decimal amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub amount: Option<DecimalInput>,
    /// Token symbol, defaults to the native asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Free text memo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// Maximum slippage as a fraction in `[0, 0.1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub max_slippage: Option<DecimalInput>,
}

/// Validated, immutable authorization record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAuthorizationRecord", into = "RawAuthorizationRecord")]
pub struct AuthorizationRecord {
    nonce: Nonce,
    timestamp: i64,
    expiry: i64,
    domain: String,
    version: String,
    source: Address,
    destination: Address,
    amount: Decimal,
    token: String,
    memo: String,
    max_slippage: Decimal,
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ShapeError> {
    value.ok_or(ShapeError::MissingField(field))
}

fn no_control_chars(field: &'static str, value: &str) -> Result<(), ShapeError> {
    if value.chars().any(char::is_control) {
        return Err(ShapeError::invalid(field, "contains control characters"));
    }
    Ok(())
}

impl TryFrom<RawAuthorizationRecord> for AuthorizationRecord {
    type Error = ShapeError;

    fn try_from(raw: RawAuthorizationRecord) -> Result<Self, Self::Error> {
        let nonce = Nonce::parse(&required(raw.nonce, "nonce")?)?;

        let timestamp = required(raw.timestamp, "timestamp")?;
        if timestamp <= 0 {
            return Err(ShapeError::invalid("timestamp", "must be positive"));
        }
        let expiry = required(raw.expiry, "expiry")?;
        if expiry <= 0 {
            return Err(ShapeError::invalid("expiry", "must be positive"));
        }

        let domain = required(raw.domain, "domain")?;
        if domain.is_empty() || domain.chars().count() > MAX_DOMAIN_CHARS {
            return Err(ShapeError::invalid(
                "domain",
                format!("expected 1-{MAX_DOMAIN_CHARS} characters"),
            ));
        }
        no_control_chars("domain", &domain)?;
        if domain.chars().any(char::is_whitespace) {
            return Err(ShapeError::invalid("domain", "contains whitespace"));
        }

        let version = required(raw.version, "version")?;
        if version.is_empty() || version.len() > 16 {
            return Err(ShapeError::invalid("version", "expected 1-16 characters"));
        }
        no_control_chars("version", &version)?;

        let source = Address::parse("source", &required(raw.source, "source")?)?;
        let destination =
            Address::parse("destination", &required(raw.destination, "destination")?)?;

        let amount = required(raw.amount, "amount")?.parse("amount")?;

        let token = raw.token.unwrap_or_else(|| NATIVE_TOKEN.to_string());
        if token.is_empty()
            || token.len() > MAX_TOKEN_CHARS
            || !token.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ShapeError::invalid(
                "token",
                format!("expected 1-{MAX_TOKEN_CHARS} alphanumeric characters"),
            ));
        }

        let memo = raw.memo.unwrap_or_default();
        if memo.chars().count() > MAX_MEMO_CHARS {
            return Err(ShapeError::invalid(
                "memo",
                format!("longer than {MAX_MEMO_CHARS} characters"),
            ));
        }
        no_control_chars("memo", &memo)?;

        let max_slippage = match raw.max_slippage {
            Some(value) => value.parse("maxSlippage")?,
            None => DEFAULT_MAX_SLIPPAGE
                .parse()
                .map_err(|e: super::decimal::DecimalError| {
                    ShapeError::invalid("maxSlippage", e.to_string())
                })?,
        };
        if max_slippage.scale() > MAX_SLIPPAGE_FRACTION_DIGITS {
            return Err(ShapeError::invalid(
                "maxSlippage",
                format!("more than {MAX_SLIPPAGE_FRACTION_DIGITS} fractional digits"),
            ));
        }

        Ok(Self {
            nonce,
            timestamp,
            expiry,
            domain,
            version,
            source,
            destination,
            amount,
            token,
            memo,
            max_slippage,
        })
    }
}

impl From<AuthorizationRecord> for RawAuthorizationRecord {
    fn from(record: AuthorizationRecord) -> Self {
        Self {
            nonce: Some(record.nonce.as_str().to_string()),
            timestamp: Some(record.timestamp),
            expiry: Some(record.expiry),
            domain: Some(record.domain),
            version: Some(record.version),
            source: Some(record.source.as_str().to_string()),
            destination: Some(record.destination.as_str().to_string()),
            amount: Some(record.amount.into()),
            token: Some(record.token),
            memo: Some(record.memo),
            max_slippage: Some(record.max_slippage.into()),
        }
    }
}

impl AuthorizationRecord {
    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    /// Creation time in milliseconds since epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Expiry time in milliseconds since epoch.
    pub fn expiry(&self) -> i64 {
        self.expiry
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn source(&self) -> &Address {
        &self.source
    }

    pub fn destination(&self) -> &Address {
        &self.destination
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Memo exactly as signed. Use [`Self::display_memo`] for rendering.
    pub fn memo(&self) -> &str {
        &self.memo
    }

    pub fn max_slippage(&self) -> Decimal {
        self.max_slippage
    }

    /// Memo with markup-unsafe characters removed, safe to embed in HTML or
    /// chat notifications.
    pub fn display_memo(&self) -> String {
        sanitize_memo(&self.memo)
    }
}

/// Strip characters that can break out of HTML or Markdown contexts.
fn sanitize_memo(memo: &str) -> String {
    memo.chars()
        .filter(|c| !matches!(c, '<' | '>' | '&' | '"' | '\'' | '`'))
        .collect()
}
