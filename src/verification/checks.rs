// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Individual validation checks.
//!
//! Every check sees the same [`CheckInput`] and either passes or returns the
//! [`Rejection`] that stops the pipeline. Shape validation is not a check
//! here: it is the typed construction of [`AuthorizationRecord`],
//! [`SignatureBytes`] and [`PublicKeyBytes`], so every input reaching these
//! checks is already well-formed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ed25519_dalek::{Signature, VerifyingKey};

use super::rejection::{BusinessRule, Rejection, TimestampIssue};
use crate::config::VerifierConfig;
use crate::protocol::token::find_policy;
use crate::protocol::{
    canonical, normalize_domain, AuthorizationRecord, Decimal, PublicKeyBytes, SignatureBytes,
    TokenPolicy, MAX_SLIPPAGE,
};
use crate::storage::{ClaimMetadata, NonceStore};

/// Everything a check may look at.
#[derive(Debug, Clone, Copy)]
pub struct CheckInput<'a> {
    pub record: &'a AuthorizationRecord,
    pub signature: &'a SignatureBytes,
    pub public_key: &'a PublicKeyBytes,
    /// Verification time, milliseconds since epoch.
    pub now: i64,
}

#[async_trait]
pub trait Check: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, input: &CheckInput<'_>) -> Result<(), Rejection>;
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

// =============================================================================
// Version
// =============================================================================

pub struct VersionCheck {
    supported: String,
}

impl VersionCheck {
    pub fn new(supported: impl Into<String>) -> Self {
        Self {
            supported: supported.into(),
        }
    }
}

#[async_trait]
impl Check for VersionCheck {
    fn name(&self) -> &'static str {
        "version"
    }

    async fn run(&self, input: &CheckInput<'_>) -> Result<(), Rejection> {
        if input.record.version() != self.supported {
            return Err(Rejection::UnsupportedVersion(
                input.record.version().to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Time window
// =============================================================================

/// `timestamp <= now + skew`, `timestamp < expiry`,
/// `expiry - timestamp <= max_validity` and `now <= expiry`.
pub struct TimeWindowCheck {
    clock_skew: i64,
    max_validity: i64,
}

impl TimeWindowCheck {
    pub fn new(clock_skew: Duration, max_validity: Duration) -> Self {
        Self {
            clock_skew: millis(clock_skew),
            max_validity: millis(max_validity),
        }
    }
}

#[async_trait]
impl Check for TimeWindowCheck {
    fn name(&self) -> &'static str {
        "time_window"
    }

    async fn run(&self, input: &CheckInput<'_>) -> Result<(), Rejection> {
        let timestamp = input.record.timestamp();
        let expiry = input.record.expiry();

        if timestamp > input.now.saturating_add(self.clock_skew) {
            return Err(Rejection::InvalidTimestamp(TimestampIssue::InFuture));
        }
        if expiry <= timestamp {
            return Err(Rejection::InvalidTimestamp(
                TimestampIssue::ExpiryBeforeCreation,
            ));
        }
        if expiry - timestamp > self.max_validity {
            return Err(Rejection::InvalidTimestamp(TimestampIssue::WindowTooLong));
        }
        if input.now > expiry {
            return Err(Rejection::Expired {
                expiry,
                now: input.now,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Domain
// =============================================================================

pub struct DomainCheck {
    allowed: Vec<String>,
}

impl DomainCheck {
    /// `allowed` entries must already be normalized.
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }
}

#[async_trait]
impl Check for DomainCheck {
    fn name(&self) -> &'static str {
        "domain"
    }

    async fn run(&self, input: &CheckInput<'_>) -> Result<(), Rejection> {
        let domain = input.record.domain();
        match normalize_domain(domain) {
            Some(normalized) if self.allowed.iter().any(|d| *d == normalized) => Ok(()),
            _ => Err(Rejection::UntrustedDomain(domain.to_string())),
        }
    }
}

// =============================================================================
// Nonce claim
// =============================================================================

/// Atomically consumes the record's nonce. Fails closed on store errors and
/// timeouts.
pub struct NonceClaimCheck {
    store: Arc<dyn NonceStore>,
    ttl: Duration,
    timeout: Duration,
}

impl NonceClaimCheck {
    pub fn new(store: Arc<dyn NonceStore>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            store,
            ttl,
            timeout,
        }
    }

    /// The entry must outlive the record itself.
    fn ttl_for(&self, record: &AuthorizationRecord, now: i64) -> Duration {
        let remaining = u64::try_from(record.expiry().saturating_sub(now)).unwrap_or(0);
        self.ttl.max(Duration::from_millis(remaining))
    }
}

#[async_trait]
impl Check for NonceClaimCheck {
    fn name(&self) -> &'static str {
        "nonce_claim"
    }

    async fn run(&self, input: &CheckInput<'_>) -> Result<(), Rejection> {
        let record = input.record;
        let nonce = record.nonce().as_str();
        let metadata = ClaimMetadata {
            domain: record.domain().to_string(),
            source: record.source().to_string(),
            token: record.token().to_string(),
            amount: record.amount().to_string(),
        };

        let claim = self
            .store
            .claim(nonce, self.ttl_for(record, input.now), metadata);
        match tokio::time::timeout(self.timeout, claim).await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err(Rejection::ReplayedNonce(nonce.to_string())),
            Ok(Err(e)) => Err(Rejection::StoreUnavailable(e.to_string())),
            Err(_) => Err(Rejection::StoreUnavailable(format!(
                "claim timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

// =============================================================================
// Signature
// =============================================================================

/// The claimed key must be the record's `source`, and must have signed the
/// canonical encoding.
pub struct SignatureCheck;

#[async_trait]
impl Check for SignatureCheck {
    fn name(&self) -> &'static str {
        "signature"
    }

    async fn run(&self, input: &CheckInput<'_>) -> Result<(), Rejection> {
        let source = input.record.source();
        if source.to_bytes() != input.public_key.0 {
            return Err(Rejection::KeyMismatch {
                source_address: source.to_string(),
                public_key: input.public_key.to_base58(),
            });
        }

        // Invalid curve points cannot have produced any signature.
        let key =
            VerifyingKey::from_bytes(&input.public_key.0).map_err(|_| Rejection::BadSignature)?;
        let signature = Signature::from_bytes(&input.signature.0);
        key.verify_strict(&canonical::encode(input.record), &signature)
            .map_err(|_| Rejection::BadSignature)
    }
}

// =============================================================================
// Business rules
// =============================================================================

pub struct BusinessRuleCheck {
    tokens: Vec<TokenPolicy>,
    max_slippage: Decimal,
}

impl BusinessRuleCheck {
    pub fn new(tokens: Vec<TokenPolicy>) -> Self {
        Self {
            tokens,
            max_slippage: MAX_SLIPPAGE.parse().unwrap_or(Decimal::ZERO),
        }
    }

    fn evaluate(&self, record: &AuthorizationRecord) -> Result<(), BusinessRule> {
        let amount = record.amount();
        if amount.is_zero() {
            return Err(BusinessRule::NonPositiveAmount);
        }

        let policy = find_policy(&self.tokens, record.token()).ok_or(BusinessRule::UnsupportedToken)?;
        if amount.scale() > policy.decimals {
            return Err(BusinessRule::ExcessPrecision);
        }
        if amount > policy.ceiling {
            return Err(BusinessRule::AmountAboveCeiling);
        }

        let source = record.source().to_bytes();
        let destination = record.destination().to_bytes();
        // The all-zero address is the system program; transfers there are lost.
        if destination == [0u8; 32] {
            return Err(BusinessRule::InvalidAddress);
        }
        if source == destination {
            return Err(BusinessRule::SameSourceAndDestination);
        }

        if record.max_slippage() > self.max_slippage {
            return Err(BusinessRule::SlippageOutOfRange);
        }
        Ok(())
    }
}

#[async_trait]
impl Check for BusinessRuleCheck {
    fn name(&self) -> &'static str {
        "business_rules"
    }

    async fn run(&self, input: &CheckInput<'_>) -> Result<(), Rejection> {
        self.evaluate(input.record).map_err(Rejection::from)
    }
}

/// Build the standard checks in pipeline order.
pub fn standard_checks(config: &VerifierConfig, store: Arc<dyn NonceStore>) -> Vec<Box<dyn Check>> {
    vec![
        Box::new(VersionCheck::new(config.supported_version.clone())),
        Box::new(TimeWindowCheck::new(config.clock_skew, config.max_validity)),
        Box::new(DomainCheck::new(config.allowed_domains.clone())),
        Box::new(NonceClaimCheck::new(
            store,
            config.nonce_ttl,
            config.store_timeout,
        )),
        Box::new(SignatureCheck),
        Box::new(BusinessRuleCheck::new(config.tokens.clone())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::test_support::raw_record;
    use crate::protocol::{DecimalInput, RawAuthorizationRecord, Signer};
    use crate::storage::{ConsumedRecord, InMemoryNonceStore, NonceStoreError, NonceStoreResult, StoreScope};

    const T: i64 = 1_700_000_000_000;
    const MINUTE: i64 = 60_000;

    fn record_with(edit: impl FnOnce(&mut RawAuthorizationRecord)) -> AuthorizationRecord {
        let mut raw = raw_record();
        edit(&mut raw);
        AuthorizationRecord::try_from(raw).unwrap()
    }

    async fn run_check(check: &dyn Check, record: &AuthorizationRecord, now: i64) -> Result<(), Rejection> {
        let signature = SignatureBytes([0u8; 64]);
        let public_key = PublicKeyBytes([1u8; 32]);
        check
            .run(&CheckInput {
                record,
                signature: &signature,
                public_key: &public_key,
                now,
            })
            .await
    }

    #[tokio::test]
    async fn version_must_match() {
        let check = VersionCheck::new("1.0");
        let record = record_with(|r| r.version = Some("2.0".to_string()));
        assert_eq!(
            run_check(&check, &record, T).await,
            Err(Rejection::UnsupportedVersion("2.0".to_string()))
        );
    }

    #[tokio::test]
    async fn time_window_rules() {
        let check = TimeWindowCheck::new(Duration::from_secs(300), Duration::from_secs(86_400));

        let future = record_with(|r| {
            r.timestamp = Some(T + 6 * MINUTE);
            r.expiry = Some(T + 20 * MINUTE);
        });
        assert_eq!(
            run_check(&check, &future, T).await,
            Err(Rejection::InvalidTimestamp(TimestampIssue::InFuture))
        );

        let within_skew = record_with(|r| {
            r.timestamp = Some(T + 5 * MINUTE);
            r.expiry = Some(T + 20 * MINUTE);
        });
        assert!(run_check(&check, &within_skew, T).await.is_ok());

        let inverted = record_with(|r| r.expiry = Some(T));
        assert_eq!(
            run_check(&check, &inverted, T).await,
            Err(Rejection::InvalidTimestamp(TimestampIssue::ExpiryBeforeCreation))
        );
    }

    #[tokio::test]
    async fn domain_is_normalized_before_lookup() {
        let check = DomainCheck::new(vec!["app.example".to_string()]);
        let upper = record_with(|r| r.domain = Some("https://App.Example".to_string()));
        assert!(run_check(&check, &upper, T).await.is_ok());

        let evil = record_with(|r| r.domain = Some("evil.example".to_string()));
        assert_eq!(
            run_check(&check, &evil, T).await,
            Err(Rejection::UntrustedDomain("evil.example".to_string()))
        );
    }

    #[tokio::test]
    async fn nonce_claim_ttl_covers_remaining_lifetime() {
        let check = NonceClaimCheck::new(
            Arc::new(InMemoryNonceStore::new()),
            Duration::from_secs(60),
            Duration::from_secs(1),
        );
        let record = record_with(|_| {});
        assert_eq!(check.ttl_for(&record, T), Duration::from_millis(900_000));
        assert_eq!(check.ttl_for(&record, T + 900_000), Duration::from_secs(60));
    }

    struct BrokenStore;

    #[async_trait]
    impl NonceStore for BrokenStore {
        async fn claim(&self, _: &str, _: Duration, _: ClaimMetadata) -> NonceStoreResult<bool> {
            Err(NonceStoreError::Task("connection refused".to_string()))
        }
        async fn info(&self, _: &str) -> NonceStoreResult<Option<ConsumedRecord>> {
            Ok(None)
        }
        async fn purge_expired(&self) -> NonceStoreResult<usize> {
            Ok(0)
        }
        fn scope(&self) -> StoreScope {
            StoreScope::Shared
        }
    }

    struct HangingStore;

    #[async_trait]
    impl NonceStore for HangingStore {
        async fn claim(&self, _: &str, _: Duration, _: ClaimMetadata) -> NonceStoreResult<bool> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(true)
        }
        async fn info(&self, _: &str) -> NonceStoreResult<Option<ConsumedRecord>> {
            Ok(None)
        }
        async fn purge_expired(&self) -> NonceStoreResult<usize> {
            Ok(0)
        }
        fn scope(&self) -> StoreScope {
            StoreScope::Shared
        }
    }

    #[tokio::test]
    async fn nonce_claim_fails_closed() {
        let record = record_with(|_| {});

        let broken = NonceClaimCheck::new(Arc::new(BrokenStore), Duration::from_secs(60), Duration::from_secs(1));
        assert!(matches!(
            run_check(&broken, &record, T).await,
            Err(Rejection::StoreUnavailable(_))
        ));

        let hanging = NonceClaimCheck::new(
            Arc::new(HangingStore),
            Duration::from_secs(60),
            Duration::from_millis(20),
        );
        assert!(matches!(
            run_check(&hanging, &record, T).await,
            Err(Rejection::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn signature_check_distinguishes_key_mismatch() {
        let signer = Signer::generate();
        let other = Signer::generate();
        let record = record_with(|r| r.source = Some(signer.address().to_string()));
        let signature = signer.sign_record(&record);

        let check = SignatureCheck;
        let ok = check
            .run(&CheckInput {
                record: &record,
                signature: &signature,
                public_key: &signer.public_key(),
                now: T,
            })
            .await;
        assert!(ok.is_ok());

        let mismatch = check
            .run(&CheckInput {
                record: &record,
                signature: &signature,
                public_key: &other.public_key(),
                now: T,
            })
            .await;
        assert!(matches!(mismatch, Err(Rejection::KeyMismatch { .. })));

        let forged = SignatureBytes(other.sign_record(&record).0);
        let bad = check
            .run(&CheckInput {
                record: &record,
                signature: &forged,
                public_key: &signer.public_key(),
                now: T,
            })
            .await;
        assert_eq!(bad, Err(Rejection::BadSignature));
    }

    #[test]
    fn business_rules() {
        let check = BusinessRuleCheck::new(crate::protocol::default_token_policies());
        let eval = |edit: fn(&mut RawAuthorizationRecord)| check.evaluate(&record_with(edit));

        assert_eq!(eval(|_| {}), Ok(()));
        assert_eq!(
            eval(|r| r.amount = Some(DecimalInput::Text("0".into()))),
            Err(BusinessRule::NonPositiveAmount)
        );
        assert_eq!(
            eval(|r| r.amount = Some(DecimalInput::Text("1000".into()))),
            Ok(())
        );
        assert_eq!(
            eval(|r| r.amount = Some(DecimalInput::Text("1000.000000001".into()))),
            Err(BusinessRule::AmountAboveCeiling)
        );
        assert_eq!(
            eval(|r| r.amount = Some(DecimalInput::Text("0.0000000001".into()))),
            Err(BusinessRule::ExcessPrecision)
        );
        assert_eq!(
            eval(|r| r.token = Some("DOGE".into())),
            Err(BusinessRule::UnsupportedToken)
        );
        assert_eq!(
            eval(|r| r.destination = r.source.clone()),
            Err(BusinessRule::SameSourceAndDestination)
        );
        assert_eq!(
            eval(|r| r.max_slippage = Some(DecimalInput::Text("0.1".into()))),
            Ok(())
        );
        assert_eq!(
            eval(|r| r.max_slippage = Some(DecimalInput::Text("0.100001".into()))),
            Err(BusinessRule::SlippageOutOfRange)
        );
        assert_eq!(
            eval(|r| r.destination = Some("11111111111111111111111111111111".into())),
            Err(BusinessRule::InvalidAddress)
        );
    }
}
