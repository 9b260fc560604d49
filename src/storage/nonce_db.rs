// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Durable nonce store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `consumed_nonces`: nonce → serialized ConsumedRecord (JSON bytes)
//!
//! redb admits one write transaction at a time, so reading the existing entry
//! and inserting the new one inside the same write transaction is an atomic
//! conditional insert. All verifier workers in the process share one
//! `Database` handle; the file survives restarts.
//!
//! redb locks the file to a single process, so this store protects exactly
//! one verifier instance. Multi-instance deployments use the redis store.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::nonce_store::{
    ClaimMetadata, ConsumedRecord, NonceStore, NonceStoreError, NonceStoreResult, StoreScope,
};

/// nonce → serialized ConsumedRecord.
const CONSUMED_NONCES: TableDefinition<&str, &[u8]> = TableDefinition::new("consumed_nonces");

/// File name of the nonce database inside the data directory.
pub const NONCE_DB_FILE: &str = "nonces.redb";

/// Raised when a claim future is dropped (e.g. by a timeout) before its
/// blocking transaction finished. The transaction then aborts instead of
/// committing a claim nobody will report.
struct AbandonOnDrop(Arc<AtomicBool>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// redb-backed [`NonceStore`].
#[derive(Clone)]
pub struct RedbNonceStore {
    db: Arc<Database>,
}

impl RedbNonceStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> NonceStoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CONSUMED_NONCES)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    fn claim_blocking(
        db: &Database,
        nonce: &str,
        record: &ConsumedRecord,
        now: DateTime<Utc>,
        abandoned: &AtomicBool,
    ) -> NonceStoreResult<bool> {
        let json = serde_json::to_vec(record)?;

        let write_txn = db.begin_write()?;
        let claimed = {
            let mut table = write_txn.open_table(CONSUMED_NONCES)?;

            let existing: Option<ConsumedRecord> = match table.get(nonce)? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };

            match existing {
                Some(previous) if !previous.is_expired_at(now) => false,
                _ => {
                    table.insert(nonce, json.as_slice())?;
                    true
                }
            }
        };

        let commit = claimed && !abandoned.load(Ordering::Acquire);
        if commit {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(commit)
    }

    fn info_blocking(
        db: &Database,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> NonceStoreResult<Option<ConsumedRecord>> {
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(CONSUMED_NONCES)?;
        match table.get(nonce)? {
            Some(value) => {
                let record: ConsumedRecord = serde_json::from_slice(value.value())?;
                Ok((!record.is_expired_at(now)).then_some(record))
            }
            None => Ok(None),
        }
    }

    fn purge_blocking(db: &Database, now: DateTime<Utc>) -> NonceStoreResult<usize> {
        let write_txn = db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(CONSUMED_NONCES)?;

            let mut expired = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                let record: ConsumedRecord = serde_json::from_slice(value.value())?;
                if record.is_expired_at(now) {
                    expired.push(key.value().to_string());
                }
            }

            for nonce in &expired {
                table.remove(nonce.as_str())?;
            }
            expired.len()
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Run a blocking redb operation off the async worker threads.
    async fn blocking<T, F>(&self, op: F) -> NonceStoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> NonceStoreResult<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| NonceStoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl NonceStore for RedbNonceStore {
    async fn claim(
        &self,
        nonce: &str,
        ttl: Duration,
        metadata: ClaimMetadata,
    ) -> NonceStoreResult<bool> {
        let now = Utc::now();
        let record = ConsumedRecord::new(metadata, ttl, now);
        let nonce = nonce.to_string();
        let abandoned = Arc::new(AtomicBool::new(false));
        let _guard = AbandonOnDrop(abandoned.clone());
        self.blocking(move |db| Self::claim_blocking(db, &nonce, &record, now, &abandoned))
            .await
    }

    async fn info(&self, nonce: &str) -> NonceStoreResult<Option<ConsumedRecord>> {
        let nonce = nonce.to_string();
        self.blocking(move |db| Self::info_blocking(db, &nonce, Utc::now()))
            .await
    }

    async fn purge_expired(&self) -> NonceStoreResult<usize> {
        self.blocking(|db| Self::purge_blocking(db, Utc::now())).await
    }

    fn scope(&self) -> StoreScope {
        StoreScope::DurableLocal
    }

    async fn ping(&self) -> NonceStoreResult<()> {
        self.blocking(|db| {
            let read_txn = db.begin_read()?;
            let _ = read_txn.open_table(CONSUMED_NONCES)?;
            Ok(())
        })
        .await
    }
}
