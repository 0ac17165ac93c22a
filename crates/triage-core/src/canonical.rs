//! # Canonical Serialization
//!
//! `CanonicalBytes` is the sole construction path for bytes that get hashed:
//! incident fingerprints, audit entry digests, and ledger payload addresses.
//!
//! ## Security Invariant
//!
//! The inner field is private and the only constructor is
//! [`CanonicalBytes::new()`], which walks the JSON tree, rejects floats, and
//! then serializes with `serde_jcs` (RFC 8785: sorted keys, compact
//! separators). Two logically equal values therefore always hash the same,
//! and a value that still carries a raw `f64` cannot be hashed at all.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization of a float-free value.
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - Numbers are integers; floats are rejected.
/// - Object keys are sorted, separators are compact (RFC 8785).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::FloatRejected` if the value contains a
    /// non-integer number, or `SerializationFailed` if serialization fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let checked = reject_floats(value)?;
        let s = serde_jcs::to_string(&checked)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into the owned byte vector (e.g. to hand to a ledger `put`).
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: Value) -> Result<Value, CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(value),
        Value::Number(ref n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(value)
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                out.insert(k, reject_floats(v)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(arr) => {
            let out: Result<Vec<_>, _> = arr.into_iter().map(reject_floats).collect();
            Ok(Value::Array(out?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_keys_and_compacts() {
        let data = serde_json::json!({"sector_id": "Sector-1", "disaster_type": "flood", "confidence_bps": 6000});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(
            std::str::from_utf8(cb.as_bytes()).unwrap(),
            r#"{"confidence_bps":6000,"disaster_type":"flood","sector_id":"Sector-1"}"#
        );
    }

    #[test]
    fn nested_objects_sorted() {
        let data = serde_json::json!({"coordinates": {"lng_micro": 2, "lat_micro": 1}, "actions": ["b", "a"]});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(
            std::str::from_utf8(cb.as_bytes()).unwrap(),
            r#"{"actions":["b","a"],"coordinates":{"lat_micro":1,"lng_micro":2}}"#
        );
    }

    #[test]
    fn raw_confidence_float_rejected() {
        let data = serde_json::json!({"confidence": 0.92});
        match CanonicalBytes::new(&data).unwrap_err() {
            CanonicalizationError::FloatRejected(f) => assert_eq!(f, 0.92),
            other => panic!("expected FloatRejected, got: {other}"),
        }
    }

    #[test]
    fn deeply_nested_float_rejected() {
        let data = serde_json::json!({"analysis": {"trace": [{"latency": 1.5}]}});
        assert!(CanonicalBytes::new(&data).is_err());
    }

    #[test]
    fn negative_integers_accepted() {
        let data = serde_json::json!({"lng_micro": -121975100});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"lng_micro":-121975100}"#);
    }

    #[test]
    fn empty_object() {
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        assert_eq!(cb.as_bytes(), b"{}");
        assert!(!cb.is_empty());
    }

    #[test]
    fn unicode_passes_through() {
        let data = serde_json::json!({"reasoning": "fum\u{00e9}e d\u{00e9}tect\u{00e9}e"});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert!(std::str::from_utf8(cb.as_bytes()).unwrap().contains('\u{00e9}'));
    }
}
