// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::claims::parse_strict_object;
use crate::error::MalformedTokenError;

/// Decoded JOSE header of a compact JWS.
///
/// Only the parameters the verifier acts on are typed. Everything else is kept
/// in `other` so callers can still inspect it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JwsHeader {
    /// Signature algorithm name. Left unvalidated here; the verifier owns the allow-list.
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub typ: Option<String>,
    #[serde(default)]
    pub kid: Option<String>,
    /// Certificate chain, standard base64 DER, leaf first (RFC 7515 §4.1.6).
    #[serde(default)]
    pub x5c: Option<Vec<String>>,
    /// Critical extensions (RFC 7515 §4.1.11).
    #[serde(default)]
    pub crit: Option<Vec<String>>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl JwsHeader {
    /// Decode header JSON, rejecting duplicate keys and non-object input.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, MalformedTokenError> {
        let map = parse_strict_object(bytes).map_err(|e| MalformedTokenError::new(format!("header: {e}")))?;
        let header: JwsHeader = serde_json::from_value(Value::Object(map))
            .map_err(|e| MalformedTokenError::new(format!("header: {e}")))?;

        // No extensions are understood, so any critical one makes the token unusable.
        if let Some(crit) = &header.crit {
            if !crit.is_empty() {
                return Err(MalformedTokenError::new(format!(
                    "header: unsupported critical parameters: {}",
                    crit.join(", ")
                )));
            }
        }

        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_fields_and_extras() {
        let h = JwsHeader::from_json_slice(br#"{"alg":"ES256","x5c":["AQ=="],"cty":"JWT"}"#).unwrap();
        assert_eq!(h.alg.as_deref(), Some("ES256"));
        assert_eq!(h.x5c, Some(vec!["AQ==".to_string()]));
        assert_eq!(h.other.get("cty"), Some(&Value::String("JWT".into())));
        assert!(h.kid.is_none());
    }

    #[test]
    fn rejects_critical_extensions() {
        let err = JwsHeader::from_json_slice(br#"{"alg":"ES256","crit":["exp"],"exp":1}"#).unwrap_err();
        assert!(err.reason().contains("critical"));

        // An empty list names nothing.
        assert!(JwsHeader::from_json_slice(br#"{"alg":"ES256","crit":[]}"#).is_ok());
    }

    #[test]
    fn rejects_duplicate_and_mistyped_parameters() {
        assert!(JwsHeader::from_json_slice(br#"{"alg":"ES256","alg":"none"}"#).is_err());
        assert!(JwsHeader::from_json_slice(br#"{"alg":7}"#).is_err());
        assert!(JwsHeader::from_json_slice(br#"{"x5c":"AQ=="}"#).is_err());
    }
}
