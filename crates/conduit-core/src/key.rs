//! Canonical fingerprinting of a logical request.
//!
//! `key()` derives a string such that two requests differing only in the
//! iteration order of a mapping (query params, a JSON object, a form body)
//! produce identical keys, while two requests differing in semantic content
//! produce different ones. It backs the `Cache`, the `Coalescer` and the
//! `RefreshController`'s de-duplication.
//!
//! `serde_json::Map` stores its entries in a `BTreeMap` unless the
//! `preserve_order` feature is enabled (it is not, here), so recursively
//! serialising a `serde_json::Value` already yields keys in lexicographic
//! order — canonicalisation falls out of the data structure rather than a
//! manual sort pass.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// The body shape a key is derived from, independent of how the caller's
/// `Body` type represents it.
#[derive(Debug, Clone)]
pub enum KeyBody<'a> {
    /// A structured JSON value; mapping keys are sorted recursively.
    Json(&'a serde_json::Value),
    /// A URL-encoded form; already a sorted mapping.
    Form(&'a BTreeMap<String, String>),
    /// Opaque bytes (e.g. a file upload); hashed to a stable digest.
    Binary(&'a [u8]),
}

/// Computes the canonical request key: `method:url:canonical(params):canonical(body)`.
pub fn key(
    method: &str,
    url: &str,
    params: Option<&BTreeMap<String, String>>,
    body: Option<KeyBody<'_>>,
) -> String {
    let mut out = String::with_capacity(url.len() + 32);
    out.push_str(method);
    out.push(':');
    out.push_str(url);
    out.push(':');
    match params {
        Some(map) if !map.is_empty() => canonicalize_string_map(map, &mut out),
        _ => out.push_str("{}"),
    }
    out.push(':');
    match body {
        Some(KeyBody::Json(value)) => {
            // serde_json::to_string on a Value backed by a BTreeMap-ordered
            // Map is already canonical; unwrap is safe, Value serialization
            // cannot fail.
            out.push_str(&serde_json::to_string(value).expect("Value serialization is infallible"));
        }
        Some(KeyBody::Form(map)) => canonicalize_string_map(map, &mut out),
        Some(KeyBody::Binary(bytes)) => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            out.push_str("sha256:");
            out.push_str(&hex::encode(hasher.finalize()));
        }
        None => out.push_str("null"),
    }
    out
}

fn canonicalize_string_map(map: &BTreeMap<String, String>, out: &mut String) {
    out.push('{');
    for (i, (k, v)) in map.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('"');
        out.push_str(k);
        out.push_str("\":\"");
        out.push_str(v);
        out.push('"');
    }
    out.push('}');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn identical_params_in_different_insertion_order_produce_the_same_key() {
        let a = params(&[("a", "1"), ("b", "2")]);
        let b = params(&[("b", "2"), ("a", "1")]);
        assert_eq!(
            key("GET", "/x", Some(&a), None),
            key("GET", "/x", Some(&b), None)
        );
    }

    #[test]
    fn differing_param_values_produce_different_keys() {
        let a = params(&[("a", "1")]);
        let b = params(&[("a", "2")]);
        assert_ne!(
            key("GET", "/x", Some(&a), None),
            key("GET", "/x", Some(&b), None)
        );
    }

    #[test]
    fn json_body_with_reordered_keys_canonicalizes_equal() {
        let a = json!({"a": 1, "b": {"c": 2, "d": 3}});
        let b = json!({"b": {"d": 3, "c": 2}, "a": 1});
        assert_eq!(
            key("POST", "/x", None, Some(KeyBody::Json(&a))),
            key("POST", "/x", None, Some(KeyBody::Json(&b)))
        );
    }

    #[test]
    fn differing_json_bodies_produce_different_keys() {
        let a = json!({"a": 1});
        let b = json!({"a": 2});
        assert_ne!(
            key("POST", "/x", None, Some(KeyBody::Json(&a))),
            key("POST", "/x", None, Some(KeyBody::Json(&b)))
        );
    }

    #[test]
    fn method_and_url_participate_in_the_key() {
        assert_ne!(key("GET", "/x", None, None), key("POST", "/x", None, None));
        assert_ne!(key("GET", "/x", None, None), key("GET", "/y", None, None));
    }

    #[test]
    fn binary_bodies_hash_to_byte_identity() {
        let a = key("POST", "/x", None, Some(KeyBody::Binary(b"hello")));
        let b = key("POST", "/x", None, Some(KeyBody::Binary(b"hello")));
        let c = key("POST", "/x", None, Some(KeyBody::Binary(b"world")));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
