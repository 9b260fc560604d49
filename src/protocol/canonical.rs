// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical message encoding.
//!
//! Signer and verifier both sign/verify the output of [`encode`]. The layout
//! is one `key:value` line per field in [`FIELD_ORDER`], joined with `\n` and
//! without a trailing newline:
//!
//! ```text
//! nonce:Qm9v...
//! timestamp:1700000000000
//! expiry:1700000900000
//! domain:app.example
//! version:1.0
//! source:4vJ9...
//! destination:8qbH...
//! amount:1.5
//! token:SOL
//! memo:rent
//! maxSlippage:0.005
//! ```
//!
//! Decimals use their normalized form (see [`Decimal`](super::decimal::Decimal)).
//! Domain and memo cannot contain control characters, so a value can never
//! forge an extra line.

use super::record::AuthorizationRecord;

/// Field order of the canonical message.
pub const FIELD_ORDER: [&str; 11] = [
    "nonce",
    "timestamp",
    "expiry",
    "domain",
    "version",
    "source",
    "destination",
    "amount",
    "token",
    "memo",
    "maxSlippage",
];

/// Separator between `key:value` lines.
pub const LINE_DELIMITER: &str = "\n";

/// Canonical message as text.
pub fn encode_string(record: &AuthorizationRecord) -> String {
    let values: [String; 11] = [
        record.nonce().to_string(),
        record.timestamp().to_string(),
        record.expiry().to_string(),
        record.domain().to_string(),
        record.version().to_string(),
        record.source().to_string(),
        record.destination().to_string(),
        record.amount().to_string(),
        record.token().to_string(),
        record.memo().to_string(),
        record.max_slippage().to_string(),
    ];

    FIELD_ORDER
        .iter()
        .zip(values.iter())
        .map(|(key, value)| format!("{key}:{value}"))
        .collect::<Vec<_>>()
        .join(LINE_DELIMITER)
}

/// Canonical message bytes (UTF-8 of [`encode_string`]).
pub fn encode(record: &AuthorizationRecord) -> Vec<u8> {
    encode_string(record).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::record::{DecimalInput, RawAuthorizationRecord};
    use crate::protocol::test_support::raw_record;
    use proptest::prelude::*;

    #[test]
    fn fields_appear_in_fixed_order() {
        let record = AuthorizationRecord::try_from(raw_record()).unwrap();
        let text = encode_string(&record);
        let keys: Vec<&str> = text
            .split(LINE_DELIMITER)
            .map(|line| line.split_once(':').unwrap().0)
            .collect();
        assert_eq!(keys, FIELD_ORDER);
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn exact_layout() {
        let raw = raw_record();
        let record = AuthorizationRecord::try_from(raw.clone()).unwrap();
        let expected = format!(
            "nonce:{}\ntimestamp:1700000000000\nexpiry:1700000900000\ndomain:app.example\n\
             version:1.0\nsource:{}\ndestination:{}\namount:1.5\ntoken:SOL\nmemo:rent\n\
             maxSlippage:0.005",
            raw.nonce.unwrap(),
            raw.source.unwrap(),
            raw.destination.unwrap()
        );
        assert_eq!(encode_string(&record), expected);
    }

    #[test]
    fn defaults_encode_like_explicit_values() {
        let mut implicit = raw_record();
        implicit.token = None;
        implicit.memo = None;
        implicit.max_slippage = None;

        let mut explicit = raw_record();
        explicit.token = Some("SOL".to_string());
        explicit.memo = Some(String::new());
        explicit.max_slippage = Some(DecimalInput::Text("0.0050".to_string()));

        let a = AuthorizationRecord::try_from(implicit).unwrap();
        let b = AuthorizationRecord::try_from(explicit).unwrap();
        assert_eq!(encode(&a), encode(&b));
    }

    #[test]
    fn number_and_string_amounts_encode_identically() {
        let mut as_text = raw_record();
        as_text.amount = Some(DecimalInput::Text("2.50".to_string()));
        let mut as_number = raw_record();
        as_number.amount = Some(DecimalInput::Number(serde_json::Number::from_f64(2.5).unwrap()));

        let a = AuthorizationRecord::try_from(as_text).unwrap();
        let b = AuthorizationRecord::try_from(as_number).unwrap();
        assert_eq!(encode(&a), encode(&b));
    }

    prop_compose! {
        fn arb_raw()(
            nonce in "[A-Za-z0-9_-]{32,64}",
            timestamp in 1i64..4_000_000_000_000,
            window in 1i64..86_400_000,
            domain in "[a-z]{1,12}\\.example",
            src in proptest::array::uniform32(any::<u8>()),
            dst in proptest::array::uniform32(any::<u8>()),
            int_part in 0u64..1_000_000,
            frac_part in "[0-9]{0,9}",
            token in proptest::option::of(prop_oneof![Just("SOL"), Just("USDC"), Just("USDT")]),
            memo in proptest::option::of("[ -~]{0,200}"),
            slippage in proptest::option::of(0u32..100_000),
        ) -> RawAuthorizationRecord {
            RawAuthorizationRecord {
                nonce: Some(nonce),
                timestamp: Some(timestamp),
                expiry: Some(timestamp + window),
                domain: Some(domain),
                version: Some("1.0".to_string()),
                source: Some(bs58::encode(src).into_string()),
                destination: Some(bs58::encode(dst).into_string()),
                amount: Some(DecimalInput::Text(format!("{int_part}.{frac_part}"))),
                token: token.map(str::to_string),
                memo,
                max_slippage: slippage.map(|ppm| DecimalInput::Text(format!("0.{ppm:06}"))),
            }
        }
    }

    proptest! {
        #[test]
        fn encoding_is_deterministic(raw in arb_raw()) {
            let first = AuthorizationRecord::try_from(raw.clone()).unwrap();
            let second = AuthorizationRecord::try_from(raw).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(encode(&first), encode(&second));

            // A record that travelled through JSON encodes to the same bytes.
            let json = serde_json::to_vec(&first).unwrap();
            let decoded: AuthorizationRecord = serde_json::from_slice(&json).unwrap();
            prop_assert_eq!(encode(&decoded), encode(&first));
        }
    }
}
