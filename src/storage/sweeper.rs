// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Expired Nonce Sweeper
//!
//! Background task that periodically drops nonce entries whose TTL has
//! elapsed, keeping the store bounded under sustained traffic. Expired
//! entries are already ignored by `claim` and `info`; sweeping only reclaims
//! space. When given the rate limiter, each sweep also forgets idle keys.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::NonceStore;
use crate::config::DEFAULT_SWEEP_INTERVAL;
use crate::rate_limit::RateLimiter;

pub struct NonceSweeper {
    store: Arc<dyn NonceStore>,
    rate_limiter: Option<Arc<RateLimiter>>,
    interval: Duration,
}

impl NonceSweeper {
    pub fn new(store: Arc<dyn NonceStore>) -> Self {
        Self {
            store,
            rate_limiter: None,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    /// Run until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            scope = self.store.scope().as_str(),
            "Nonce sweeper starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Nonce sweeper shutting down");
                    return;
                }
            }

            self.sweep_once().await;
        }
    }

    /// One sweep; returns the number of nonce entries removed.
    pub async fn sweep_once(&self) -> usize {
        if let Some(limiter) = &self.rate_limiter {
            limiter.retain_recent();
            debug!(tracked_keys = limiter.tracked_keys(), "Rate limiter pruned");
        }

        match self.store.purge_expired().await {
            Ok(0) => {
                debug!("Nonce sweeper: nothing to purge");
                0
            }
            Ok(removed) => {
                info!(removed, "Nonce sweeper: purged expired nonces");
                removed
            }
            Err(e) => {
                warn!(error = %e, "Nonce sweeper: purge failed");
                0
            }
        }
    }
}
