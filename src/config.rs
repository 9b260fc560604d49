// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! typed configuration built from them at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for the nonce database and audit logs | `/data` |
//! | `ALLOWED_DOMAINS` | Comma-separated origins records may be bound to | `localhost` |
//! | `NONCE_STORE` | `redb` (one instance), `redis` (shared) or `memory` (process-local, degraded) | `redb` |
//! | `REDIS_URL` | Redis server for `NONCE_STORE=redis` | `redis://127.0.0.1:6379` |
//! | `NONCE_TTL_SECS` | How long a consumed nonce is remembered | `86400` |
//! | `MAX_VALIDITY_SECS` | Longest allowed `expiry - timestamp` | `86400` |
//! | `CLOCK_SKEW_SECS` | Tolerance for timestamps in the future | `300` |
//! | `STORE_TIMEOUT_MS` | Timeout for a single nonce store call | `2000` |
//! | `RATE_LIMIT_PER_MINUTE` | Verifications per public key per minute (0 = off) | `30` |
//! | `SWEEP_INTERVAL_SECS` | Interval between expired-nonce sweeps | `600` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::time::Duration;

use crate::logging::LogFormat;
use crate::protocol::{default_token_policies, normalize_domain, TokenPolicy, PROTOCOL_VERSION};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory path.
///
/// Holds `nonces.redb` and the `audit/` tree.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const ALLOWED_DOMAINS_ENV: &str = "ALLOWED_DOMAINS";
pub const NONCE_STORE_ENV: &str = "NONCE_STORE";
pub const REDIS_URL_ENV: &str = "REDIS_URL";
pub const NONCE_TTL_SECS_ENV: &str = "NONCE_TTL_SECS";
pub const MAX_VALIDITY_SECS_ENV: &str = "MAX_VALIDITY_SECS";
pub const CLOCK_SKEW_SECS_ENV: &str = "CLOCK_SKEW_SECS";
pub const STORE_TIMEOUT_MS_ENV: &str = "STORE_TIMEOUT_MS";
pub const RATE_LIMIT_PER_MINUTE_ENV: &str = "RATE_LIMIT_PER_MINUTE";
pub const SWEEP_INTERVAL_SECS_ENV: &str = "SWEEP_INTERVAL_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "/data";
pub const DEFAULT_ALLOWED_DOMAIN: &str = "localhost";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_NONCE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_MAX_VALIDITY: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(2_000);
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 30;
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Upper bound on the nonce TTL, to keep storage bounded.
pub const MAX_NONCE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
    #[error("allowed domain list is empty")]
    NoAllowedDomains,
    #[error("nonce TTL ({ttl_secs}s) must be at least the maximum validity window ({window_secs}s)")]
    NonceTtlTooShort { ttl_secs: u64, window_secs: u64 },
    #[error("nonce TTL ({0}s) exceeds the 7 day cap")]
    NonceTtlTooLong(u64),
}

/// Settings of the validation pipeline.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// The single protocol version accepted.
    pub supported_version: String,
    /// Normalized `host[:port]` entries.
    pub allowed_domains: Vec<String>,
    pub clock_skew: Duration,
    pub max_validity: Duration,
    pub nonce_ttl: Duration,
    pub store_timeout: Duration,
    pub tokens: Vec<TokenPolicy>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            supported_version: PROTOCOL_VERSION.to_string(),
            allowed_domains: vec![DEFAULT_ALLOWED_DOMAIN.to_string()],
            clock_skew: DEFAULT_CLOCK_SKEW,
            max_validity: DEFAULT_MAX_VALIDITY,
            nonce_ttl: DEFAULT_NONCE_TTL,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            tokens: default_token_policies(),
        }
    }
}

impl VerifierConfig {
    /// Replace the allow-list; entries are normalized like record domains.
    pub fn with_allowed_domains<I, S>(mut self, domains: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_domains = domains
            .into_iter()
            .map(|d| {
                normalize_domain(d.as_ref()).ok_or_else(|| ConfigError::InvalidValue {
                    name: ALLOWED_DOMAINS_ENV,
                    value: d.as_ref().to_string(),
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed_domains.is_empty() {
            return Err(ConfigError::NoAllowedDomains);
        }
        if self.nonce_ttl < self.max_validity {
            return Err(ConfigError::NonceTtlTooShort {
                ttl_secs: self.nonce_ttl.as_secs(),
                window_secs: self.max_validity.as_secs(),
            });
        }
        if self.nonce_ttl > MAX_NONCE_TTL {
            return Err(ConfigError::NonceTtlTooLong(self.nonce_ttl.as_secs()));
        }
        Ok(())
    }
}

/// Which [`NonceStore`](crate::storage::NonceStore) backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceStoreKind {
    Redb,
    Redis,
    Memory,
}

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub nonce_store: NonceStoreKind,
    pub redis_url: String,
    pub rate_limit_per_minute: u32,
    pub sweep_interval: Duration,
    pub log_format: LogFormat,
    pub verifier: VerifierConfig,
}

impl ServiceConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = parse_or(&get, PORT_ENV, DEFAULT_PORT)?;
        let nonce_store = match get(NONCE_STORE_ENV).as_deref().map(str::trim) {
            None | Some("redb") => NonceStoreKind::Redb,
            Some("redis") => NonceStoreKind::Redis,
            Some("memory") => NonceStoreKind::Memory,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: NONCE_STORE_ENV,
                    value: other.to_string(),
                })
            }
        };

        let domains: Vec<String> = match get(ALLOWED_DOMAINS_ENV) {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect(),
            None => vec![DEFAULT_ALLOWED_DOMAIN.to_string()],
        };

        let verifier = VerifierConfig {
            nonce_ttl: secs_or(&get, NONCE_TTL_SECS_ENV, DEFAULT_NONCE_TTL)?,
            max_validity: secs_or(&get, MAX_VALIDITY_SECS_ENV, DEFAULT_MAX_VALIDITY)?,
            clock_skew: secs_or(&get, CLOCK_SKEW_SECS_ENV, DEFAULT_CLOCK_SKEW)?,
            store_timeout: Duration::from_millis(parse_or(
                &get,
                STORE_TIMEOUT_MS_ENV,
                DEFAULT_STORE_TIMEOUT.as_millis() as u64,
            )?),
            ..VerifierConfig::default()
        }
        .with_allowed_domains(domains)?;
        verifier.validate()?;

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())),
            nonce_store,
            redis_url: get(REDIS_URL_ENV).unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            rate_limit_per_minute: parse_or(
                &get,
                RATE_LIMIT_PER_MINUTE_ENV,
                DEFAULT_RATE_LIMIT_PER_MINUTE,
            )?,
            sweep_interval: secs_or(&get, SWEEP_INTERVAL_SECS_ENV, DEFAULT_SWEEP_INTERVAL)?,
            log_format: get(LOG_FORMAT_ENV)
                .map(|v| LogFormat::from_str_lossy(&v))
                .unwrap_or(LogFormat::Pretty),
            verifier,
        })
    }

    /// Directory holding daily audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.data_dir.join("audit")
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}

fn secs_or<G>(get: &G, name: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    parse_or(get, name, default.as_secs()).map(Duration::from_secs)
}
