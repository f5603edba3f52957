//! # Canonical JSON Encoding
//!
//! Replicas vote on byte equality, so every JSON value that participates in
//! consensus must serialize to exactly one byte sequence. The canonical form
//! is: object keys sorted lexicographically, no insignificant whitespace,
//! scalar encoding as produced by `serde_json`.
//!
//! Two correct replicas holding structurally equal values therefore always
//! produce identical bytes, and a body that arrives already-canonical is
//! re-encoded to itself.

use serde::Serialize;
use serde_json::Value;

use crate::errors::EnvelopeError;

/// Render a JSON value in canonical form.
pub fn to_canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

/// Canonically encode any serializable value.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, EnvelopeError> {
    let v = serde_json::to_value(value).map_err(|e| EnvelopeError::Encode(e.to_string()))?;
    Ok(to_canonical_string(&v).into_bytes())
}

/// Compact an incoming request body.
///
/// JSON bodies are canonicalized so that the ingress node and every replaying
/// replica parse identical bytes. Non-JSON bodies pass through verbatim.
pub fn compact_body(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(v) => to_canonical_string(&v),
        Err(_) => raw.to_string(),
    }
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Key encoding goes through serde_json for correct escaping.
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_value(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
