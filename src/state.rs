// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{NonceStoreKind, ServiceConfig, VerifierConfig, DEFAULT_RATE_LIMIT_PER_MINUTE};
use crate::rate_limit::RateLimiter;
use crate::storage::{
    AuditSink, InMemoryNonceStore, JsonlAuditSink, NonceStore, NonceStoreResult, RedbNonceStore,
    RedisNonceStore, TracingAuditSink, NONCE_DB_FILE,
};
use crate::verification::Verifier;

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<Verifier>,
    pub nonce_store: Arc<dyn NonceStore>,
    pub audit: Arc<dyn AuditSink>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Reported by the health endpoint when set.
    pub data_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        verifier_config: VerifierConfig,
        nonce_store: Arc<dyn NonceStore>,
        audit: Arc<dyn AuditSink>,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            verifier: Arc::new(Verifier::new(verifier_config, nonce_store.clone())),
            nonce_store,
            audit,
            rate_limiter: Arc::new(rate_limiter),
            data_dir: None,
        }
    }

    /// Replace the verifier (e.g. one with a fixed clock).
    pub fn with_verifier(mut self, verifier: Verifier) -> Self {
        self.verifier = Arc::new(verifier);
        self
    }

    /// Build the production state: open (or connect to) the configured nonce
    /// store and the audit log under the data directory.
    pub async fn from_config(config: &ServiceConfig) -> NonceStoreResult<Self> {
        let (nonce_store, audit): (Arc<dyn NonceStore>, Arc<dyn AuditSink>) =
            match config.nonce_store {
                NonceStoreKind::Redb => (
                    Arc::new(RedbNonceStore::open(&config.data_dir.join(NONCE_DB_FILE))?),
                    Arc::new(JsonlAuditSink::new(config.audit_dir())),
                ),
                NonceStoreKind::Redis => (
                    Arc::new(RedisNonceStore::connect(&config.redis_url).await?),
                    Arc::new(JsonlAuditSink::new(config.audit_dir())),
                ),
                NonceStoreKind::Memory => (
                    Arc::new(InMemoryNonceStore::new()),
                    Arc::new(TracingAuditSink),
                ),
            };

        let mut state = Self::new(
            config.verifier.clone(),
            nonce_store,
            audit,
            RateLimiter::per_minute(config.rate_limit_per_minute),
        );
        if config.nonce_store != NonceStoreKind::Memory {
            state.data_dir = Some(config.data_dir.clone());
        }
        Ok(state)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(
            VerifierConfig::default(),
            Arc::new(InMemoryNonceStore::new()),
            Arc::new(TracingAuditSink),
            RateLimiter::per_minute(DEFAULT_RATE_LIMIT_PER_MINUTE),
        )
    }
}
