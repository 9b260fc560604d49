// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The verifier: typed construction followed by the standard pipeline.
//!
//! Its only side effect is the nonce claim. A successful verdict therefore
//! cannot be repeated: the same record verifies as `Valid` at most once and
//! as `Invalid(REPLAYED_NONCE)` afterwards. Logging and auditing belong to
//! the caller.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::checks::CheckInput;
use super::clock::{Clock, SystemClock};
use super::pipeline::Pipeline;
use super::rejection::Rejection;
use crate::config::VerifierConfig;
use crate::protocol::{
    decode_link, AuthorizationRecord, PublicKeyBytes, RawAuthorizationRecord, SignatureBytes,
};
use crate::storage::NonceStore;

/// Outcome of a verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid {
        record: AuthorizationRecord,
        verified_at: DateTime<Utc>,
    },
    Invalid {
        reason: Rejection,
    },
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid { .. })
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Verdict::Valid { .. } => None,
            Verdict::Invalid { reason } => Some(reason),
        }
    }
}

impl From<Rejection> for Verdict {
    fn from(reason: Rejection) -> Self {
        Verdict::Invalid { reason }
    }
}

/// An untyped verification request, as received from a caller.
#[derive(Debug, Clone)]
pub struct Submission {
    pub record: RawAuthorizationRecord,
    pub signature: String,
    pub public_key: String,
}

impl Submission {
    /// Shape check: build the typed record, signature and key.
    pub fn parse(self) -> Result<(AuthorizationRecord, SignatureBytes, PublicKeyBytes), Rejection> {
        let record = AuthorizationRecord::try_from(self.record)?;
        let signature = SignatureBytes::parse(self.signature.trim())?;
        let public_key = PublicKeyBytes::parse(self.public_key.trim())?;
        Ok((record, signature, public_key))
    }
}

pub struct Verifier {
    config: VerifierConfig,
    pipeline: Pipeline,
    clock: Arc<dyn Clock>,
}

impl Verifier {
    pub fn new(config: VerifierConfig, store: Arc<dyn NonceStore>) -> Self {
        let pipeline = Pipeline::standard(&config, store);
        Self {
            config,
            pipeline,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verify an already well-formed record.
    pub async fn verify(
        &self,
        record: AuthorizationRecord,
        signature: &SignatureBytes,
        public_key: &PublicKeyBytes,
    ) -> Verdict {
        let now = self.clock.now_millis();
        let input = CheckInput {
            record: &record,
            signature,
            public_key,
            now,
        };

        match self.pipeline.run(&input).await {
            Ok(()) => Verdict::Valid {
                verified_at: DateTime::from_timestamp_millis(now).unwrap_or_else(Utc::now),
                record,
            },
            Err(reason) => Verdict::Invalid { reason },
        }
    }

    /// Verify untyped input; shape failures never reach the nonce store.
    pub async fn verify_submission(&self, submission: Submission) -> Verdict {
        match submission.parse() {
            Ok((record, signature, public_key)) => {
                self.verify(record, &signature, &public_key).await
            }
            Err(reason) => reason.into(),
        }
    }

    /// Decode a transport link and verify it against `public_key`.
    pub async fn verify_link(&self, link: &str, public_key: &str) -> Verdict {
        match decode_link(link) {
            Ok(decoded) => {
                self.verify_submission(Submission {
                    record: decoded.record,
                    signature: decoded.signature,
                    public_key: public_key.to_string(),
                })
                .await
            }
            Err(e) => Rejection::from(e).into(),
        }
    }
}
