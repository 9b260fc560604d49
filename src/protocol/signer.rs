// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Record creation and Ed25519 signing.
//!
//! The signer is the client-side half of the protocol. It is used by tests,
//! by tooling that mints links, and as the reference for what a browser
//! wallet must produce. The signing key never leaves this struct.

use std::time::Duration;

use chrono::{DateTime, Utc};
use ed25519_dalek::{Signer as _, SigningKey};
use rand::rngs::OsRng;

use super::canonical;
use super::link::{encode_link, LinkError};
use super::record::{AuthorizationRecord, DecimalInput, RawAuthorizationRecord};
use super::types::{normalize_domain, Address, Nonce, PublicKeyBytes, ShapeError, SignatureBytes};
use super::{DEFAULT_VALIDITY, PROTOCOL_VERSION};

/// Errors raised while building a signed record.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("invalid origin: {0}")]
    InvalidOrigin(String),
    #[error("invalid transfer request: {0}")]
    InvalidRequest(#[from] ShapeError),
}

/// What the user asked to pay. Everything else in the record is filled in by
/// the signer.
#[derive(Debug, Clone, Default)]
pub struct TransferRequest {
    pub destination: String,
    pub amount: String,
    pub token: Option<String>,
    pub memo: Option<String>,
    pub max_slippage: Option<String>,
}

/// A record together with its detached signature.
#[derive(Debug, Clone)]
pub struct SignedAuthorization {
    pub record: AuthorizationRecord,
    pub signature: SignatureBytes,
}

impl SignedAuthorization {
    /// Transport link for this authorization, e.g. `/pay?d=...&s=...&v=1.0`.
    pub fn to_link(&self, path: &str) -> Result<String, LinkError> {
        encode_link(path, &self.record, &self.signature)
    }
}

/// Holder of an Ed25519 wallet key.
pub struct Signer {
    key: SigningKey,
    validity: Duration,
}

impl Signer {
    pub fn new(key: SigningKey) -> Self {
        Self {
            key,
            validity: DEFAULT_VALIDITY,
        }
    }

    /// Signer with a fresh random key.
    pub fn generate() -> Self {
        Self::new(SigningKey::generate(&mut OsRng))
    }

    /// Override the lifetime given to new records.
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    pub fn public_key(&self) -> PublicKeyBytes {
        PublicKeyBytes(self.key.verifying_key().to_bytes())
    }

    /// The signer's address; records it signs always use it as `source`.
    pub fn address(&self) -> Address {
        Address::from_bytes(&self.key.verifying_key().to_bytes())
    }

    /// Create and sign a record for `request`, bound to `origin`.
    pub fn sign(
        &self,
        request: TransferRequest,
        origin: &str,
    ) -> Result<SignedAuthorization, SignerError> {
        self.sign_at(request, origin, Utc::now())
    }

    /// Same as [`Self::sign`] with an explicit creation time.
    pub fn sign_at(
        &self,
        request: TransferRequest,
        origin: &str,
        now: DateTime<Utc>,
    ) -> Result<SignedAuthorization, SignerError> {
        let domain =
            normalize_domain(origin).ok_or_else(|| SignerError::InvalidOrigin(origin.to_string()))?;
        let timestamp = now.timestamp_millis();
        let expiry = timestamp + self.validity.as_millis() as i64;

        let raw = RawAuthorizationRecord {
            nonce: Some(Nonce::generate().to_string()),
            timestamp: Some(timestamp),
            expiry: Some(expiry),
            domain: Some(domain),
            version: Some(PROTOCOL_VERSION.to_string()),
            source: Some(self.address().to_string()),
            destination: Some(request.destination),
            amount: Some(DecimalInput::Text(request.amount)),
            token: request.token,
            memo: request.memo,
            max_slippage: request.max_slippage.map(DecimalInput::Text),
        };

        let record = AuthorizationRecord::try_from(raw)?;
        let signature = self.sign_record(&record);
        Ok(SignedAuthorization { record, signature })
    }

    /// Sign the canonical encoding of an existing record.
    pub fn sign_record(&self, record: &AuthorizationRecord) -> SignatureBytes {
        let message = canonical::encode(record);
        SignatureBytes(self.key.sign(&message).to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    fn request() -> TransferRequest {
        TransferRequest {
            destination: Address::from_bytes(&[2u8; 32]).to_string(),
            amount: "0.25".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn signed_record_carries_protocol_fields() {
        let signer = Signer::generate();
        let now = Utc::now();
        let signed = signer.sign_at(request(), "https://App.Example/checkout", now).unwrap();

        let record = &signed.record;
        assert_eq!(record.domain(), "app.example");
        assert_eq!(record.version(), PROTOCOL_VERSION);
        assert_eq!(record.source(), &signer.address());
        assert_eq!(record.timestamp(), now.timestamp_millis());
        assert_eq!(
            record.expiry() - record.timestamp(),
            DEFAULT_VALIDITY.as_millis() as i64
        );
        assert_eq!(record.token(), "SOL");
    }

    #[test]
    fn signature_verifies_over_canonical_bytes() {
        let signer = Signer::generate();
        let signed = signer.sign(request(), "app.example").unwrap();

        let key = VerifyingKey::from_bytes(&signer.public_key().0).unwrap();
        let sig = Signature::from_bytes(&signed.signature.0);
        assert!(key.verify(&canonical::encode(&signed.record), &sig).is_ok());
    }

    #[test]
    fn every_record_gets_a_fresh_nonce() {
        let signer = Signer::generate();
        let a = signer.sign(request(), "app.example").unwrap();
        let b = signer.sign(request(), "app.example").unwrap();
        assert_ne!(a.record.nonce(), b.record.nonce());
    }

    #[test]
    fn rejects_unusable_origin() {
        let signer = Signer::generate();
        assert!(matches!(
            signer.sign(request(), ""),
            Err(SignerError::InvalidOrigin(_))
        ));
    }

    #[test]
    fn rejects_malformed_request() {
        let signer = Signer::generate();
        let mut bad = request();
        bad.amount = "ten".to_string();
        assert!(matches!(
            signer.sign(bad, "app.example"),
            Err(SignerError::InvalidRequest(_))
        ));
    }
}
