// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Paylink Verifier - Signed Payment Link Authorization Service
//!
//! A payer signs a transfer request with an Ed25519 wallet key and shares it
//! as a link. This service checks, before anything executes, that the request
//! is authentic, fresh, bound to a trusted origin and not previously used.
//!
//! ## Modules
//!
//! - `protocol` - record model, canonical encoding, signer and link format
//! - `verification` - validation pipeline and verifier
//! - `storage` - nonce stores, sweeper and audit sinks
//! - `api` - HTTP API handlers (Axum)
//! - `rate_limit` - per-key request limiting

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod protocol;
pub mod rate_limit;
pub mod state;
pub mod storage;
pub mod verification;
