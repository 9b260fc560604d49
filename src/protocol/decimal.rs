// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed-point decimal used for amounts and slippage.
//!
//! Values are kept normalized (fractional trailing zeros stripped), so two
//! decimals are equal exactly when their fields are equal and the canonical
//! string form is unique per value. This is what lets independent signer and
//! verifier implementations agree byte-for-byte on `amount:` and
//! `maxSlippage:` lines.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Maximum number of fractional digits accepted on input.
pub const MAX_FRACTION_DIGITS: usize = 18;

/// Maximum number of integer digits accepted on input (keeps values in u128).
pub const MAX_INTEGER_DIGITS: usize = 20;

/// Reasons a decimal string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecimalError {
    #[error("empty value")]
    Empty,
    #[error("unexpected character '{0}'")]
    InvalidCharacter(char),
    #[error("more than one decimal point")]
    MultiplePoints,
    #[error("no digits")]
    NoDigits,
    #[error("too many integer digits")]
    IntegerTooLong,
    #[error("too many fractional digits")]
    FractionTooLong,
}

/// A non-negative decimal number `units / 10^scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    units: u128,
    scale: u32,
}

impl Decimal {
    pub const ZERO: Decimal = Decimal { units: 0, scale: 0 };

    /// Build from an integer number of whole units.
    pub fn from_integer(value: u64) -> Self {
        Self {
            units: u128::from(value),
            scale: 0,
        }
    }

    /// Number of significant fractional digits.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.units == 0
    }

    /// Express the value in base units of a token with `decimals` places.
    ///
    /// Returns `None` when the value carries more precision than the token
    /// supports or the result would overflow.
    pub fn to_base_units(&self, decimals: u32) -> Option<u128> {
        if self.scale > decimals {
            return None;
        }
        10u128
            .checked_pow(decimals - self.scale)
            .and_then(|factor| self.units.checked_mul(factor))
    }

    fn integer_part(&self) -> u128 {
        self.units / 10u128.pow(self.scale)
    }

    /// Fractional part widened to `MAX_FRACTION_DIGITS` digits.
    fn fraction_part(&self) -> u128 {
        let frac = self.units % 10u128.pow(self.scale);
        frac * 10u128.pow(MAX_FRACTION_DIGITS as u32 - self.scale)
    }
}

impl FromStr for Decimal {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(DecimalError::Empty);
        }

        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => {
                if f.contains('.') {
                    return Err(DecimalError::MultiplePoints);
                }
                (i, f)
            }
            None => (s, ""),
        };

        if let Some(c) = int_part
            .chars()
            .chain(frac_part.chars())
            .find(|c| !c.is_ascii_digit())
        {
            return Err(DecimalError::InvalidCharacter(c));
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(DecimalError::NoDigits);
        }

        let int_part = int_part.trim_start_matches('0');
        let frac_part = frac_part.trim_end_matches('0');

        if int_part.len() > MAX_INTEGER_DIGITS {
            return Err(DecimalError::IntegerTooLong);
        }
        if frac_part.len() > MAX_FRACTION_DIGITS {
            return Err(DecimalError::FractionTooLong);
        }

        let digits = format!("{int_part}{frac_part}");
        let units = if digits.is_empty() {
            0
        } else {
            // At most 38 digits, always fits in u128.
            digits
                .parse::<u128>()
                .map_err(|_| DecimalError::IntegerTooLong)?
        };

        Ok(Self {
            units,
            scale: if units == 0 { 0 } else { frac_part.len() as u32 },
        })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.units);
        }
        let scale = self.scale as usize;
        let digits = format!("{:0>width$}", self.units, width = scale + 1);
        let (int, frac) = digits.split_at(digits.len() - scale);
        write!(f, "{int}.{frac}")
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.integer_part()
            .cmp(&other.integer_part())
            .then_with(|| self.fraction_part().cmp(&other.fraction_part()))
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn normalizes_to_canonical_form() {
        assert_eq!(d("1.50").to_string(), "1.5");
        assert_eq!(d("2.000").to_string(), "2");
        assert_eq!(d(".5").to_string(), "0.5");
        assert_eq!(d("007.25").to_string(), "7.25");
        assert_eq!(d("0.000000001").to_string(), "0.000000001");
        assert_eq!(d("0").to_string(), "0");
        assert_eq!(d("0.000").to_string(), "0");
        assert_eq!(d("5.").to_string(), "5");
    }

    #[test]
    fn equal_values_have_equal_fields() {
        assert_eq!(d("1.50"), d("1.5"));
        assert_eq!(d("0010"), d("10.0"));
        assert_ne!(d("1.05"), d("1.5"));
    }

    #[test]
    fn rejects_non_decimal_input() {
        assert_eq!("".parse::<Decimal>(), Err(DecimalError::Empty));
        assert_eq!("-1".parse::<Decimal>(), Err(DecimalError::InvalidCharacter('-')));
        assert_eq!("1e9".parse::<Decimal>(), Err(DecimalError::InvalidCharacter('e')));
        assert_eq!("1.2.3".parse::<Decimal>(), Err(DecimalError::MultiplePoints));
        assert_eq!(".".parse::<Decimal>(), Err(DecimalError::NoDigits));
        assert_eq!(
            "0.1234567890123456789".parse::<Decimal>(),
            Err(DecimalError::FractionTooLong)
        );
        assert_eq!(
            "123456789012345678901".parse::<Decimal>(),
            Err(DecimalError::IntegerTooLong)
        );
    }

    #[test]
    fn ordering_aligns_scales() {
        assert!(d("0.1") > d("0.09999"));
        assert!(d("1000.000000001") > d("1000"));
        assert!(d("999.999") < d("1000"));
        assert_eq!(d("0.10").cmp(&d("0.1")), Ordering::Equal);
    }

    #[test]
    fn base_units_respect_token_precision() {
        assert_eq!(d("1.5").to_base_units(9), Some(1_500_000_000));
        assert_eq!(d("0.000001").to_base_units(6), Some(1));
        assert_eq!(d("0.0000001").to_base_units(6), None);
        assert_eq!(Decimal::from_integer(1000).to_base_units(9), Some(1_000_000_000_000));
    }
}
