// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Strongly-typed protocol primitives.
//!
//! Each type here can only be built through a parser that enforces its
//! transport shape, so code past the shape check never sees a nonce with the
//! wrong alphabet or a signature of the wrong length.

use std::fmt;

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};

use super::NONCE_BYTES;

/// Shape errors raised while turning transport strings into typed values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("invalid `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

impl ShapeError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ShapeError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Transport length bounds for a nonce.
pub const NONCE_MIN_CHARS: usize = 32;
pub const NONCE_MAX_CHARS: usize = 64;

/// Base58 length bounds for 32-byte values (addresses and public keys).
pub const ADDRESS_MIN_CHARS: usize = 32;
pub const ADDRESS_MAX_CHARS: usize = 44;

/// Base58 length bounds for a 64-byte Ed25519 signature.
pub const SIGNATURE_MIN_CHARS: usize = 64;
pub const SIGNATURE_MAX_CHARS: usize = 88;

/// Longest domain accepted (DNS name limit).
pub const MAX_DOMAIN_CHARS: usize = 253;

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

fn is_base58(s: &str) -> bool {
    s.chars().all(|c| BASE58_ALPHABET.contains(c))
}

fn check_length(field: &'static str, value: &str, min: usize, max: usize) -> Result<(), ShapeError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ShapeError::invalid(
            field,
            format!("expected {min}-{max} characters, got {len}"),
        ));
    }
    Ok(())
}

// =============================================================================
// Nonce
// =============================================================================

/// Single-use random token, transported as unpadded base64url.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nonce(String);

impl Nonce {
    /// Generate a fresh nonce from the operating system CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(Base64UrlUnpadded::encode_string(&bytes))
    }

    pub fn parse(value: &str) -> Result<Self, ShapeError> {
        check_length("nonce", value, NONCE_MIN_CHARS, NONCE_MAX_CHARS)?;
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ShapeError::invalid("nonce", "not URL-safe base64"));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Address
// =============================================================================

/// Ledger address: a 32-byte identifier transported as base58.
///
/// Parsing decodes the value, so any `Address` holds exactly 32 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    text: String,
    bytes: [u8; 32],
}

impl Address {
    pub fn parse(field: &'static str, value: &str) -> Result<Self, ShapeError> {
        check_length(field, value, ADDRESS_MIN_CHARS, ADDRESS_MAX_CHARS)?;
        if !is_base58(value) {
            return Err(ShapeError::invalid(field, "not base58"));
        }
        let decoded = bs58::decode(value)
            .into_vec()
            .map_err(|_| ShapeError::invalid(field, "not base58"))?;
        let bytes: [u8; 32] = decoded
            .try_into()
            .map_err(|_| ShapeError::invalid(field, "expected 32 bytes"))?;
        Ok(Self {
            text: value.to_string(),
            bytes,
        })
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            text: bs58::encode(bytes).into_string(),
            bytes: *bytes,
        }
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.bytes
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// =============================================================================
// Keys and signatures
// =============================================================================

/// Ed25519 public key bytes as claimed by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKeyBytes(pub [u8; 32]);

impl PublicKeyBytes {
    pub fn parse(value: &str) -> Result<Self, ShapeError> {
        check_length("publicKey", value, ADDRESS_MIN_CHARS, ADDRESS_MAX_CHARS)?;
        let decoded = bs58::decode(value)
            .into_vec()
            .map_err(|_| ShapeError::invalid("publicKey", "not base58"))?;
        let bytes: [u8; 32] = decoded
            .try_into()
            .map_err(|_| ShapeError::invalid("publicKey", "expected 32 bytes"))?;
        Ok(Self(bytes))
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

/// Detached Ed25519 signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureBytes(pub [u8; 64]);

impl SignatureBytes {
    pub fn parse(value: &str) -> Result<Self, ShapeError> {
        check_length("signature", value, SIGNATURE_MIN_CHARS, SIGNATURE_MAX_CHARS)?;
        let decoded = bs58::decode(value)
            .into_vec()
            .map_err(|_| ShapeError::invalid("signature", "not base58"))?;
        let bytes: [u8; 64] = decoded
            .try_into()
            .map_err(|_| ShapeError::invalid("signature", "expected 64 bytes"))?;
        Ok(Self(bytes))
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

// =============================================================================
// Domains
// =============================================================================

/// Reduce an origin or bare host to the lowercase `host[:port]` form used for
/// allow-list comparison.
///
/// Accepts `https://app.example`, `https://App.Example:8443/path` or
/// `app.example`. Returns `None` for values that are not a usable host.
pub fn normalize_domain(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let url = url::Url::parse(&candidate).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    })
}
