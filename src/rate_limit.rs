// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-key rate limiting (GCRA token bucket via `governor`).
//!
//! Each public key gets a bucket of `limit` cells refilled at `limit` per
//! minute, so no key gets more than its quota in any 60 second span.
//! Buckets live in governor's keyed `DashMap` state; [`RateLimiter::retain_recent`]
//! drops the ones that have fully refilled.

use std::num::NonZeroU32;

use governor::{DefaultKeyedRateLimiter, Quota};

pub struct RateLimiter {
    /// `None` when limiting is disabled.
    limiter: Option<DefaultKeyedRateLimiter<String>>,
}

impl RateLimiter {
    /// `limit` requests per key per minute; `0` disables limiting.
    pub fn per_minute(limit: u32) -> Self {
        match NonZeroU32::new(limit) {
            Some(limit) => Self::with_quota(Quota::per_minute(limit)),
            None => Self::disabled(),
        }
    }

    pub fn with_quota(quota: Quota) -> Self {
        Self {
            limiter: Some(DefaultKeyedRateLimiter::keyed(quota)),
        }
    }

    pub fn disabled() -> Self {
        Self { limiter: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Count one request for `key`; `false` when over the limit.
    pub fn check(&self, key: &str) -> bool {
        match &self.limiter {
            Some(limiter) => limiter.check_key(&key.to_string()).is_ok(),
            None => true,
        }
    }

    /// Forget keys whose bucket is full again.
    pub fn retain_recent(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.limiter.as_ref().map_or(0, |limiter| limiter.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn limits_per_key() {
        let limiter = RateLimiter::per_minute(3);
        for _ in 0..3 {
            assert!(limiter.check("a"));
        }
        assert!(!limiter.check("a"));
        assert!(limiter.check("b"));
    }

    #[test]
    fn zero_disables() {
        let limiter = RateLimiter::per_minute(0);
        assert!(!limiter.is_enabled());
        for _ in 0..100 {
            assert!(limiter.check("a"));
        }
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn refill_is_gradual_not_a_window_reset() {
        // Two cells, one back every 100ms.
        let quota = Quota::with_period(Duration::from_millis(100))
            .unwrap()
            .allow_burst(NonZeroU32::new(2).unwrap());
        let limiter = RateLimiter::with_quota(quota);

        assert!(limiter.check("k"));
        assert!(limiter.check("k"));
        assert!(!limiter.check("k"));

        // A fixed window would hand back the whole quota here.
        std::thread::sleep(Duration::from_millis(120));
        assert!(limiter.check("k"));
        assert!(!limiter.check("k"));
    }

    #[test]
    fn retain_recent_drops_refilled_keys() {
        let quota = Quota::with_period(Duration::from_millis(5)).unwrap();
        let limiter = RateLimiter::with_quota(quota);
        assert!(limiter.check("a"));
        assert!(limiter.check("b"));
        assert_eq!(limiter.tracked_keys(), 2);

        std::thread::sleep(Duration::from_millis(20));
        limiter.retain_recent();
        assert_eq!(limiter.tracked_keys(), 0);
    }
}
