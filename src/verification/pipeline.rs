// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ordered, fail-fast composition of [`Check`]s.
//!
//! Cheap structural, temporal and domain checks run before the nonce claim so
//! that untrusted input never consumes a nonce; the claim runs before the
//! signature check so a signature cannot be probed against a nonce that a
//! legitimate request is claiming at the same moment.

use std::sync::Arc;

use super::checks::{standard_checks, Check, CheckInput};
use super::rejection::Rejection;
use crate::config::VerifierConfig;
use crate::storage::NonceStore;

pub struct Pipeline {
    checks: Vec<Box<dyn Check>>,
}

impl Pipeline {
    pub fn new(checks: Vec<Box<dyn Check>>) -> Self {
        Self { checks }
    }

    /// Version, time window, domain, nonce claim, signature, business rules.
    pub fn standard(config: &VerifierConfig, store: Arc<dyn NonceStore>) -> Self {
        Self::new(standard_checks(config, store))
    }

    /// Check names in execution order.
    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Run every check in order; the first failure wins.
    pub async fn run(&self, input: &CheckInput<'_>) -> Result<(), Rejection> {
        for check in &self.checks {
            check.run(input).await?;
        }
        Ok(())
    }
}
