//! Canonical form and content hash of configuration payloads.
//!
//! Mappings and sequences are rendered exactly as the host application's
//! `json.dumps(content, sort_keys=True)` renders them (`", "` / `": "`
//! separators, ASCII-only output), so digests computed here match digests
//! already stored by the host.

use std::fmt::Write as _;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// A payload in canonical form together with its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedConfig {
    pub canonical: String,
    pub digest: String,
}

impl NormalizedConfig {
    pub fn from_value(content: &Value) -> Self {
        let canonical = normalize_config_content(content);
        let digest = sha256_hex(&canonical);
        Self { canonical, digest }
    }
}

/// Canonicalize a configuration payload for hashing.
///
/// Falsy input (null, false, 0, empty string, empty list or map) becomes the
/// empty string. Strings are trimmed only; their internal ordering is kept.
pub fn normalize_config_content(content: &Value) -> String {
    if is_falsy(content) {
        return String::new();
    }

    match content {
        Value::Object(_) | Value::Array(_) => {
            let mut out = String::new();
            write_canonical(&mut out, content);
            out
        }
        Value::String(s) => s.trim().to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Number(n) => n.to_string(),
        // unreachable after the falsy check, kept total
        Value::Null | Value::Bool(false) => String::new(),
    }
}

/// SHA-256 hex digest of the canonical form of `content`.
pub fn compute_config_hash(content: &Value) -> String {
    sha256_hex(&normalize_config_content(content))
}

/// Compute SHA256 hash of content.
pub fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Canonical JSON text for `value`, sorted keys, host separators.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(&mut out, value);
    out
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => {
            let _ = write!(out, "{}", n);
        }
        Value::String(s) => write_ascii_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_ascii_string(out, key);
                out.push_str(": ");
                write_canonical(out, &map[key]);
            }
            out.push('}');
        }
    }
}

fn write_ascii_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ' '..='~' => out.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{:04x}", unit);
                }
            }
        }
    }
    out.push('"');
}
