// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-local nonce store.
//!
//! Claims go through `DashMap::entry`, which holds the shard lock for the key
//! while deciding, so concurrent claims of one nonce serialize. Used in tests
//! and as an explicitly degraded deployment mode.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};

use super::nonce_store::{
    ClaimMetadata, ConsumedRecord, NonceStore, NonceStoreResult, StoreScope,
};

#[derive(Debug, Default)]
pub struct InMemoryNonceStore {
    entries: DashMap<String, ConsumedRecord>,
}

impl InMemoryNonceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl NonceStore for InMemoryNonceStore {
    async fn claim(
        &self,
        nonce: &str,
        ttl: Duration,
        metadata: ClaimMetadata,
    ) -> NonceStoreResult<bool> {
        let now = Utc::now();
        let record = ConsumedRecord::new(metadata, ttl, now);

        let claimed = match self.entries.entry(nonce.to_string()) {
            Entry::Occupied(mut existing) => {
                if existing.get().is_expired_at(now) {
                    existing.insert(record);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        };
        Ok(claimed)
    }

    async fn info(&self, nonce: &str) -> NonceStoreResult<Option<ConsumedRecord>> {
        let now = Utc::now();
        Ok(self
            .entries
            .get(nonce)
            .map(|entry| entry.value().clone())
            .filter(|record| !record.is_expired_at(now)))
    }

    async fn purge_expired(&self) -> NonceStoreResult<usize> {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, record| !record.is_expired_at(now));
        Ok(before.saturating_sub(self.entries.len()))
    }

    fn scope(&self) -> StoreScope {
        StoreScope::ProcessLocal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn metadata() -> ClaimMetadata {
        ClaimMetadata {
            domain: "app.example".to_string(),
            source: "src".to_string(),
            token: "SOL".to_string(),
            amount: "1".to_string(),
        }
    }

    const DAY: Duration = Duration::from_secs(86_400);

    #[tokio::test]
    async fn first_claim_wins() {
        let store = InMemoryNonceStore::new();
        assert!(store.claim("n1", DAY, metadata()).await.unwrap());
        assert!(!store.claim("n1", DAY, metadata()).await.unwrap());
        assert!(store.claim("n2", DAY, metadata()).await.unwrap());
    }

    #[tokio::test]
    async fn info_reports_consumed_nonce() {
        let store = InMemoryNonceStore::new();
        assert!(store.info("n1").await.unwrap().is_none());

        store.claim("n1", DAY, metadata()).await.unwrap();
        let info = store.info("n1").await.unwrap().unwrap();
        assert_eq!(info.metadata, metadata());
        assert!(info.expires_at > info.consumed_at);
    }

    #[tokio::test]
    async fn expired_entries_can_be_reclaimed_and_purged() {
        let store = InMemoryNonceStore::new();
        store
            .claim("n1", Duration::from_millis(1), metadata())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert!(store.info("n1").await.unwrap().is_none());
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(store.is_empty());
        assert!(store.claim("n1", DAY, metadata()).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_claims_have_one_winner() {
        let store = Arc::new(InMemoryNonceStore::new());
        let handles: Vec<_> = (0..64)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.claim("contended", DAY, metadata()).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[test]
    fn scope_is_process_local() {
        assert!(InMemoryNonceStore::new().scope().is_degraded());
    }
}
