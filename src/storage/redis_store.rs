// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared nonce store backed by Redis.
//!
//! ## Key Layout
//!
//! - `paylink:nonce:{nonce}`: serialized ConsumedRecord (JSON), expiring with
//!   the claim TTL
//!
//! A claim is one `SET key value NX PX ttl`: the server either creates the key
//! or leaves the existing one alone, so concurrent claims from any number of
//! verifier instances have exactly one winner. Redis drops expired keys on its
//! own, which leaves nothing for the sweeper to do.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::nonce_store::{ClaimMetadata, ConsumedRecord, NonceStore, NonceStoreResult, StoreScope};

/// Prefix of every nonce key.
pub const NONCE_KEY_PREFIX: &str = "paylink:nonce:";

fn nonce_key(nonce: &str) -> String {
    format!("{NONCE_KEY_PREFIX}{nonce}")
}

/// `PX` argument for a TTL; at least one millisecond since Redis rejects zero.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Redis-backed [`NonceStore`].
#[derive(Clone)]
pub struct RedisNonceStore {
    conn: ConnectionManager,
}

impl RedisNonceStore {
    /// Connect to the server at `url` (e.g. `redis://cache:6379/0`).
    ///
    /// The connection manager reconnects on its own after a dropped link.
    pub async fn connect(url: &str) -> NonceStoreResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl NonceStore for RedisNonceStore {
    async fn claim(
        &self,
        nonce: &str,
        ttl: Duration,
        metadata: ClaimMetadata,
    ) -> NonceStoreResult<bool> {
        let record = ConsumedRecord::new(metadata, ttl, Utc::now());
        let json = serde_json::to_string(&record)?;

        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(nonce_key(nonce))
            .arg(json)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        // "OK" when the key was created, nil when it already existed.
        Ok(reply.is_some())
    }

    async fn info(&self, nonce: &str) -> NonceStoreResult<Option<ConsumedRecord>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(nonce_key(nonce)).await?;
        match value {
            Some(json) => {
                let record: ConsumedRecord = serde_json::from_str(&json)?;
                Ok((!record.is_expired_at(Utc::now())).then_some(record))
            }
            None => Ok(None),
        }
    }

    async fn purge_expired(&self) -> NonceStoreResult<usize> {
        Ok(0)
    }

    fn scope(&self) -> StoreScope {
        StoreScope::Shared
    }

    async fn ping(&self) -> NonceStoreResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(nonce_key("abc"), "paylink:nonce:abc");
    }

    #[test]
    fn ttl_is_never_zero() {
        assert_eq!(ttl_millis(Duration::ZERO), 1);
        assert_eq!(ttl_millis(Duration::from_secs(86_400)), 86_400_000);
        assert_eq!(ttl_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn bad_url_is_rejected() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let result = runtime.block_on(RedisNonceStore::connect("not a redis url"));
        assert!(matches!(
            result,
            Err(crate::storage::NonceStoreError::Redis(_))
        ));
    }

    /// Runs against a live server when `REDIS_TEST_URL` is set.
    async fn live_store() -> Option<RedisNonceStore> {
        let url = std::env::var("REDIS_TEST_URL").ok()?;
        Some(RedisNonceStore::connect(&url).await.unwrap())
    }

    fn metadata() -> ClaimMetadata {
        ClaimMetadata {
            domain: "app.example".to_string(),
            source: "src".to_string(),
            token: "USDC".to_string(),
            amount: "12.5".to_string(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn live_claim_is_single_use_across_connections() {
        let Some(store) = live_store().await else {
            return;
        };
        let nonce = crate::protocol::Nonce::generate().to_string();
        let ttl = Duration::from_secs(60);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                let nonce = nonce.clone();
                tokio::spawn(async move { store.claim(&nonce, ttl, metadata()).await })
            })
            .collect();
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);

        let info = store.info(&nonce).await.unwrap().unwrap();
        assert_eq!(info.metadata.token, "USDC");
        store.ping().await.unwrap();
        assert_eq!(store.scope(), StoreScope::Shared);
    }
}
