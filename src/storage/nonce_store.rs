// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Nonce store contract.
//!
//! The only mutation is [`NonceStore::claim`]: a single conditional insert
//! that moves a nonce from "unseen" to "consumed" and reports whether this
//! call made the transition. There is deliberately no `exists` + `insert`
//! pair; implementations must make the check and the write one atomic step.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What was submitted alongside a consumed nonce (diagnostics only, unverified
/// at claim time).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimMetadata {
    pub domain: String,
    pub source: String,
    pub token: String,
    pub amount: String,
}

/// A consumed nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsumedRecord {
    pub consumed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub metadata: ClaimMetadata,
}

impl ConsumedRecord {
    pub fn new(metadata: ClaimMetadata, ttl: Duration, now: DateTime<Utc>) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            consumed_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            metadata,
        }
    }

    /// Whether the entry's TTL has elapsed; expired entries count as unseen.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Reach of a store's replay protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum StoreScope {
    /// Visible only to this process. Replays against another instance are not
    /// detected; run this way only as a degraded mode.
    ProcessLocal,
    /// Survives restarts but is locked to one process. Safe only while a
    /// single verifier instance is running.
    DurableLocal,
    /// Networked and visible to every verifier instance pointed at it.
    Shared,
}

impl StoreScope {
    pub fn is_degraded(&self) -> bool {
        matches!(self, StoreScope::ProcessLocal)
    }

    /// Whether replays against another verifier instance are detected.
    pub fn is_shared(&self) -> bool {
        matches!(self, StoreScope::Shared)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreScope::ProcessLocal => "process-local",
            StoreScope::DurableLocal => "durable-local",
            StoreScope::Shared => "shared",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NonceStoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store task failed: {0}")]
    Task(String),
}

pub type NonceStoreResult<T> = Result<T, NonceStoreError>;

/// Shared record of consumed nonces.
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Atomically mark `nonce` consumed for `ttl`.
    ///
    /// Returns `true` only for the call that performed the transition. A nonce
    /// whose previous entry has expired may be claimed again.
    async fn claim(
        &self,
        nonce: &str,
        ttl: Duration,
        metadata: ClaimMetadata,
    ) -> NonceStoreResult<bool>;

    /// Read-only lookup. Never use this to decide whether to accept a record.
    async fn info(&self, nonce: &str) -> NonceStoreResult<Option<ConsumedRecord>>;

    /// Drop expired entries, returning how many were removed.
    async fn purge_expired(&self) -> NonceStoreResult<usize>;

    /// Reach of this store's replay protection.
    fn scope(&self) -> StoreScope;

    /// Cheap reachability probe for readiness checks.
    async fn ping(&self) -> NonceStoreResult<()> {
        Ok(())
    }
}
