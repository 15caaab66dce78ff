// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Token claims and strict JSON object decoding.
//!
//! `serde_json` silently keeps the last value when an object repeats a key.
//! Tokens are security sensitive, so both the header and the payload are
//! decoded through [`parse_strict_object`], which rejects duplicate keys at
//! every nesting depth instead.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::MalformedTokenError;

/// Claim name to JSON value. Keys are case-sensitive and iterate in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Decode a JSON object payload, rejecting duplicate keys.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, MalformedTokenError> {
        parse_strict_object(bytes)
            .map(Self)
            .map_err(|e| MalformedTokenError::new(format!("payload: {e}")))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Pretty JSON with sorted keys and four-space indentation.
    pub fn to_pretty_json(&self) -> String {
        let mut out = Vec::new();
        let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, fmt);
        // Serializing a map of `Value`s into a Vec cannot fail.
        if self.0.serialize(&mut ser).is_err() {
            return String::new();
        }
        String::from_utf8(out).unwrap_or_default()
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Claims> for Map<String, Value> {
    fn from(claims: Claims) -> Self {
        claims.0
    }
}

/// Parse `bytes` as a single JSON object whose objects never repeat a key.
pub fn parse_strict_object(bytes: &[u8]) -> Result<Map<String, Value>, String> {
    let StrictValue(value) = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(format!("expected a JSON object, got {}", kind_of(&other))),
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

struct StrictValue(Value);

impl<'de> Deserialize<'de> for StrictValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(StrictValueVisitor).map(StrictValue)
    }
}

struct StrictValueVisitor;

impl<'de> Visitor<'de> for StrictValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
        Ok(Number::from_f64(v).map_or(Value::Null, Value::Number))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_owned()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        StrictValue::deserialize(deserializer).map(|v| v.0)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(StrictValue(v)) = seq.next_element()? {
            out.push(v);
        }
        Ok(Value::Array(out))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut out = Map::new();
        while let Some(key) = map.next_key::<String>()? {
            if out.contains_key(&key) {
                return Err(de::Error::custom(format!("duplicate key `{key}`")));
            }
            let StrictValue(v) = map.next_value()?;
            out.insert(key, v);
        }
        Ok(Value::Object(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_object_with_sorted_iteration() {
        let claims = Claims::from_json_slice(br#"{"nonce":"abc","aud":"x","n":1}"#).unwrap();
        let keys: Vec<&str> = claims.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["aud", "n", "nonce"]);
        assert_eq!(claims.get("nonce"), Some(&json!("abc")));
        assert!(!claims.contains("NONCE"));
    }

    #[test]
    fn rejects_top_level_duplicate_key() {
        let err = Claims::from_json_slice(br#"{"nonce":"a","nonce":"b"}"#).unwrap_err();
        assert!(err.reason().contains("duplicate key `nonce`"), "{err}");
    }

    #[test]
    fn rejects_nested_duplicate_key() {
        let err = Claims::from_json_slice(br#"{"a":[{"k":1,"k":2}]}"#).unwrap_err();
        assert!(err.reason().contains("duplicate key `k`"), "{err}");
    }

    #[test]
    fn rejects_non_objects_and_trailing_data() {
        assert!(Claims::from_json_slice(b"[1,2]").is_err());
        assert!(Claims::from_json_slice(b"\"s\"").is_err());
        assert!(Claims::from_json_slice(b"{} {}").is_err());
        assert!(Claims::from_json_slice(b"").is_err());
    }

    #[test]
    fn keeps_number_kinds_distinct() {
        let claims = Claims::from_json_slice(br#"{"i":1,"f":1.0,"neg":-3,"s":"1"}"#).unwrap();
        assert_eq!(claims.get("i"), Some(&json!(1)));
        assert_eq!(claims.get("f"), Some(&json!(1.0)));
        assert_ne!(claims.get("i"), claims.get("f"));
        assert_eq!(claims.get("neg"), Some(&json!(-3)));
        assert_eq!(claims.get("s"), Some(&json!("1")));
    }

    #[test]
    fn pretty_json_uses_four_space_indent() {
        let claims = Claims::from_json_slice(br#"{"b":2,"a":1}"#).unwrap();
        assert_eq!(claims.to_pretty_json(), "{\n    \"a\": 1,\n    \"b\": 2\n}");
    }
}
