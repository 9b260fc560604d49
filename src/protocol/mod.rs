// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Signed Authorization Protocol
//!
//! Everything a signer and a verifier must agree on byte-for-byte:
//!
//! - `decimal` - fixed-point amounts with one canonical string form
//! - `types` - nonces, addresses, keys and signatures with shape parsing
//! - `record` - the authorization record and its typed constructor
//! - `canonical` - the signed message layout
//! - `signer` - record creation and Ed25519 signing
//! - `link` - the `d`/`s`/`v` transport link
//! - `token` - supported tokens and ceilings

use std::time::Duration;

pub mod canonical;
pub mod decimal;
pub mod link;
pub mod record;
pub mod signer;
pub mod token;
pub mod types;

pub use decimal::Decimal;
pub use link::{decode_link, encode_link, DecodedLink, LinkError};
pub use record::{AuthorizationRecord, DecimalInput, RawAuthorizationRecord};
pub use signer::{SignedAuthorization, Signer, SignerError, TransferRequest};
pub use token::{default_token_policies, TokenPolicy};
pub use types::{normalize_domain, Address, Nonce, PublicKeyBytes, ShapeError, SignatureBytes};

/// The only protocol version this service accepts.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Token used when a record omits `token`.
pub const NATIVE_TOKEN: &str = "SOL";

/// Slippage used when a record omits `maxSlippage`.
pub const DEFAULT_MAX_SLIPPAGE: &str = "0.005";

/// Largest accepted slippage (10%).
pub const MAX_SLIPPAGE: &str = "0.1";

/// Slippage precision accepted on input.
pub const MAX_SLIPPAGE_FRACTION_DIGITS: u32 = 6;

/// Longest memo, in characters.
pub const MAX_MEMO_CHARS: usize = 200;

/// Raw nonce size.
pub const NONCE_BYTES: usize = 32;

/// Default lifetime of a freshly signed record.
pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(15 * 60);

#[cfg(test)]
pub(crate) mod test_support {
    use super::record::{DecimalInput, RawAuthorizationRecord};

    pub const SOURCE_BYTES: [u8; 32] = [1u8; 32];
    pub const DESTINATION_BYTES: [u8; 32] = [2u8; 32];

    /// A well-formed record created at 1_700_000_000_000 ms with a 15 minute
    /// window for `app.example`.
    pub fn raw_record() -> RawAuthorizationRecord {
        RawAuthorizationRecord {
            nonce: Some("bm9uY2Utbm9uY2Utbm9uY2Utbm9uY2Utbm9uY2UtMDE".to_string()),
            timestamp: Some(1_700_000_000_000),
            expiry: Some(1_700_000_900_000),
            domain: Some("app.example".to_string()),
            version: Some("1.0".to_string()),
            source: Some(bs58::encode(SOURCE_BYTES).into_string()),
            destination: Some(bs58::encode(DESTINATION_BYTES).into_string()),
            amount: Some(DecimalInput::Text("1.5".to_string())),
            token: Some("SOL".to_string()),
            memo: Some("rent".to_string()),
            max_slippage: Some(DecimalInput::Text("0.005".to_string())),
        }
    }
}
