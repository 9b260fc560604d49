// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transport link codec.
//!
//! A link is an origin-relative path with three query parameters:
//!
//! - `d` - the record as JSON, standard base64
//! - `s` - the signature, base58
//! - `v` - the protocol version
//!
//! Decoding stops at the untyped record; turning it into an
//! [`AuthorizationRecord`] is the verifier's shape check.

use base64ct::{Base64, Encoding};
use url::Url;

use super::record::{AuthorizationRecord, RawAuthorizationRecord};
use super::types::SignatureBytes;

/// Path used for links minted without an explicit one.
pub const DEFAULT_LINK_PATH: &str = "/pay";

/// Base used to resolve origin-relative links while parsing.
const PARSE_BASE: &str = "http://link.invalid/";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("link is not a valid URL")]
    InvalidUrl,
    #[error("missing link parameter `{0}`")]
    MissingParameter(&'static str),
    #[error("duplicate link parameter `{0}`")]
    DuplicateParameter(&'static str),
    #[error("link payload is not valid base64")]
    InvalidBase64,
    #[error("link payload is not a JSON record: {0}")]
    InvalidJson(String),
    #[error("link version does not match record version")]
    VersionMismatch,
}

/// Parameters extracted from a link.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLink {
    pub record: RawAuthorizationRecord,
    pub signature: String,
    pub version: String,
}

/// Build a link for a signed record.
pub fn encode_link(
    path: &str,
    record: &AuthorizationRecord,
    signature: &SignatureBytes,
) -> Result<String, LinkError> {
    let json = serde_json::to_vec(record).map_err(|e| LinkError::InvalidJson(e.to_string()))?;
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("d", &Base64::encode_string(&json))
        .append_pair("s", &signature.to_base58())
        .append_pair("v", record.version())
        .finish();
    Ok(format!("{path}?{query}"))
}

/// Parse a link (relative or absolute) into its parameters.
pub fn decode_link(link: &str) -> Result<DecodedLink, LinkError> {
    let base = Url::parse(PARSE_BASE).map_err(|_| LinkError::InvalidUrl)?;
    let url = base.join(link.trim()).map_err(|_| LinkError::InvalidUrl)?;

    let mut data = None;
    let mut signature = None;
    let mut version = None;
    for (key, value) in url.query_pairs() {
        let (slot, name) = match key.as_ref() {
            "d" => (&mut data, "d"),
            "s" => (&mut signature, "s"),
            "v" => (&mut version, "v"),
            _ => continue,
        };
        if slot.is_some() {
            return Err(LinkError::DuplicateParameter(name));
        }
        *slot = Some(value.into_owned());
    }

    let data = data.ok_or(LinkError::MissingParameter("d"))?;
    let signature = signature.ok_or(LinkError::MissingParameter("s"))?;
    let version = version.ok_or(LinkError::MissingParameter("v"))?;

    let json = Base64::decode_vec(&data).map_err(|_| LinkError::InvalidBase64)?;
    let record: RawAuthorizationRecord =
        serde_json::from_slice(&json).map_err(|e| LinkError::InvalidJson(e.to_string()))?;

    if record.version.as_deref().is_some_and(|v| v != version) {
        return Err(LinkError::VersionMismatch);
    }

    Ok(DecodedLink {
        record,
        signature,
        version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::test_support::raw_record;
    use base64::Engine;

    fn sample() -> (AuthorizationRecord, SignatureBytes) {
        (
            AuthorizationRecord::try_from(raw_record()).unwrap(),
            SignatureBytes([3u8; 64]),
        )
    }

    #[test]
    fn link_carries_three_parameters() {
        let (record, sig) = sample();
        let link = encode_link(DEFAULT_LINK_PATH, &record, &sig).unwrap();
        assert!(link.starts_with("/pay?d="));

        let decoded = decode_link(&link).unwrap();
        assert_eq!(decoded.signature, sig.to_base58());
        assert_eq!(decoded.version, "1.0");
        assert_eq!(
            AuthorizationRecord::try_from(decoded.record).unwrap(),
            record
        );
    }

    #[test]
    fn payload_is_standard_base64_json() {
        let (record, sig) = sample();
        let link = encode_link("/pay", &record, &sig).unwrap();
        let url = Url::parse(PARSE_BASE).unwrap().join(&link).unwrap();
        let d = url
            .query_pairs()
            .find(|(k, _)| k == "d")
            .map(|(_, v)| v.into_owned())
            .unwrap();

        // Decode with an independent base64 implementation.
        let json = base64::engine::general_purpose::STANDARD.decode(d).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["domain"], "app.example");
        assert_eq!(value["amount"], "1.5");
    }

    #[test]
    fn absolute_links_are_accepted() {
        let (record, sig) = sample();
        let link = encode_link("/pay", &record, &sig).unwrap();
        let absolute = format!("https://app.example{link}");
        assert!(decode_link(&absolute).is_ok());
    }

    #[test]
    fn missing_parameters_are_rejected() {
        let (record, sig) = sample();
        let link = encode_link("/pay", &record, &sig).unwrap();

        let without_v = link.split("&v=").next().unwrap().to_string();
        assert_eq!(decode_link(&without_v), Err(LinkError::MissingParameter("v")));

        assert_eq!(decode_link("/pay?s=abc&v=1.0"), Err(LinkError::MissingParameter("d")));
        assert_eq!(decode_link("/pay?d=e30&v=1.0"), Err(LinkError::MissingParameter("s")));
    }

    #[test]
    fn duplicate_parameters_are_rejected() {
        let (record, sig) = sample();
        let link = encode_link("/pay", &record, &sig).unwrap();
        let doubled = format!("{link}&s=other");
        assert_eq!(decode_link(&doubled), Err(LinkError::DuplicateParameter("s")));
    }

    #[test]
    fn version_parameter_must_match_record() {
        let (record, sig) = sample();
        let link = encode_link("/pay", &record, &sig).unwrap();
        let tampered = link.replace("v=1.0", "v=2.0");
        assert_eq!(decode_link(&tampered), Err(LinkError::VersionMismatch));
    }

    #[test]
    fn garbage_payload_is_rejected() {
        assert_eq!(
            decode_link("/pay?d=%%%&s=abc&v=1.0"),
            Err(LinkError::InvalidBase64)
        );
    }
}
