// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Request correlation: does the token answer the request we sent?

use padlock_common::Claims;
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_CLAIM_NAME: &str = "nonce";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("claim `{name}` is missing from the token")]
pub struct ClaimMissingError {
    pub name: String,
}

impl ClaimMissingError {
    pub fn error_code(&self) -> &'static str {
        "CLAIM_MISSING"
    }
}

/// The claim a token must carry to belong to one outstanding request.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimExpectation {
    pub name: String,
    pub value: Value,
}

impl ClaimExpectation {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Expect `nonce == value`.
    pub fn nonce(value: impl Into<Value>) -> Self {
        Self::new(DEFAULT_CLAIM_NAME, value)
    }
}

/// Exact JSON equality between `claims[claim_name]` and `expected`.
///
/// No normalization: `"123"` is not `123`, and `1` is not `1.0`.
pub fn matches_claim(claims: &Claims, claim_name: &str, expected: impl Into<Value>) -> Result<bool, ClaimMissingError> {
    let actual = claims.get(claim_name).ok_or_else(|| ClaimMissingError {
        name: claim_name.to_string(),
    })?;
    Ok(*actual == expected.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(v: Value) -> Claims {
        Claims::from_json_slice(v.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn nonce_match_mismatch_and_missing() {
        let c = claims(json!({"nonce": "abc"}));
        assert_eq!(matches_claim(&c, "nonce", "abc"), Ok(true));
        assert_eq!(matches_claim(&c, "nonce", "xyz"), Ok(false));

        let err = matches_claim(&c, "missing", "abc").unwrap_err();
        assert_eq!(err.name, "missing");
        assert_eq!(err.error_code(), "CLAIM_MISSING");
    }

    #[test]
    fn comparison_is_type_and_case_exact() {
        let c = claims(json!({"s": "123", "i": 1, "f": 1.5, "n": null, "case": "Abc"}));
        assert_eq!(matches_claim(&c, "s", 123), Ok(false));
        assert_eq!(matches_claim(&c, "s", "123"), Ok(true));
        assert_eq!(matches_claim(&c, "i", 1.0), Ok(false));
        assert_eq!(matches_claim(&c, "i", 1), Ok(true));
        assert_eq!(matches_claim(&c, "f", 1.5), Ok(true));
        assert_eq!(matches_claim(&c, "n", Value::Null), Ok(true));
        assert_eq!(matches_claim(&c, "case", "abc"), Ok(false));
        // Claim names are case-sensitive too.
        assert!(matches_claim(&c, "S", "123").is_err());
    }

    #[test]
    fn unicode_forms_are_not_normalized() {
        // "é" precomposed vs "e" + combining acute.
        let c = claims(json!({"nonce": "\u{e9}"}));
        assert_eq!(matches_claim(&c, "nonce", "e\u{301}"), Ok(false));
        assert_eq!(matches_claim(&c, "nonce", "\u{e9}"), Ok(true));
    }

    #[test]
    fn expectation_defaults_to_nonce() {
        let e = ClaimExpectation::nonce("abc");
        assert_eq!(e.name, "nonce");
        assert_eq!(e.value, json!("abc"));
    }
}
