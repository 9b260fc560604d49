// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent and shared state of the verifier:
//!
//! - `nonce_store` - the [`NonceStore`] contract (atomic claim with TTL)
//! - `memory` - process-local store (tests, degraded mode)
//! - `nonce_db` - durable redb store (single instance)
//! - `redis_store` - shared Redis store (multi-instance)
//! - `sweeper` - background purge of expired nonces
//! - `audit` - audit sinks for verification outcomes
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   nonces.redb            # consumed nonces
//!   audit/
//!     {date}/events.jsonl  # daily audit logs
//! ```

pub mod audit;
pub mod memory;
pub mod nonce_db;
pub mod nonce_store;
pub mod redis_store;
pub mod sweeper;

pub use audit::{AuditError, AuditEvent, AuditEventType, AuditSink, JsonlAuditSink, TracingAuditSink};
pub use memory::InMemoryNonceStore;
pub use nonce_db::{RedbNonceStore, NONCE_DB_FILE};
pub use nonce_store::{
    ClaimMetadata, ConsumedRecord, NonceStore, NonceStoreError, NonceStoreResult, StoreScope,
};
pub use redis_store::RedisNonceStore;
pub use sweeper::NonceSweeper;
