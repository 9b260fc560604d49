// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Supported tokens and their per-token limits.

use super::decimal::Decimal;

/// Limits applied to one supported token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPolicy {
    /// Symbol as it appears in the `token` field.
    pub symbol: String,
    /// Number of fractional digits the ledger can represent.
    pub decimals: u32,
    /// Largest amount a single authorization may move.
    pub ceiling: Decimal,
}

impl TokenPolicy {
    pub fn new(symbol: impl Into<String>, decimals: u32, ceiling: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
            ceiling,
        }
    }
}

/// Default token set: the native asset plus two stablecoins.
pub fn default_token_policies() -> Vec<TokenPolicy> {
    vec![
        TokenPolicy::new("SOL", 9, Decimal::from_integer(1_000)),
        TokenPolicy::new("USDC", 6, Decimal::from_integer(1_000_000)),
        TokenPolicy::new("USDT", 6, Decimal::from_integer(1_000_000)),
    ]
}

/// Find the policy for a symbol (exact, case-sensitive match).
pub fn find_policy<'a>(policies: &'a [TokenPolicy], symbol: &str) -> Option<&'a TokenPolicy> {
    policies.iter().find(|p| p.symbol == symbol)
}
