//! Content addressing: canonical JSON serialization and BLAKE3 identity
//!
//! Canonical JSON is the only serializer used for identity and must be
//! byte-stable across runs, hosts, and libraries:
//!
//! - object keys sort lexicographically on the unicode code points of the
//!   original key strings, at every depth
//! - arrays preserve order
//! - no whitespace is emitted
//! - numbers render in the minimal form the input parsed to (integers as
//!   integer literals, floats in shortest round-trip form)
//! - strings escape `"` and `\` and the control range U+0000–U+001F
//!
//! A value that cannot be canonicalized fails before any id is computed.

use serde_json::Value;

use crate::domain::{NodeId, NodeKind};
use crate::error::{Result, StoreError};

/// Serialize a JSON value to its canonical byte form.
pub fn canonical_json(value: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(128);
    write_value(value, &mut out);
    out
}

/// Canonical form as a UTF-8 string (what the node table stores).
pub fn canonical_json_string(value: &Value) -> String {
    // write_value only ever emits valid UTF-8
    String::from_utf8(canonical_json(value)).unwrap_or_default()
}

/// Derive a node id: `BLAKE3(kind ‖ "\n" ‖ canonical_json(payload))`.
///
/// Payloads are ordered mappings, so anything but a JSON object is refused
/// before hashing.
pub fn node_id(kind: NodeKind, payload: &Value) -> Result<NodeId> {
    if !payload.is_object() {
        return Err(StoreError::invariant(format!(
            "{} payload must be a JSON object",
            kind
        )));
    }
    let mut hasher = blake3::Hasher::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(&canonical_json(payload));
    Ok(NodeId::from_bytes(*hasher.finalize().as_bytes()))
}

/// Hex BLAKE3 digest of raw bytes (object-store key format).
pub fn blob_digest(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Lowercase hex encoding.
pub fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push(HEX_DIGITS[(b >> 4) as usize] as char);
        s.push(HEX_DIGITS[(b & 0x0f) as usize] as char);
    }
    s
}

/// Decode a hex string (either case). Odd length or a non-hex character is
/// an invariant violation.
pub fn hex_decode(s: &str) -> Result<Vec<u8>> {
    if s.len() % 2 != 0 {
        return Err(StoreError::invariant(format!(
            "odd-length hex string '{}'",
            s
        )));
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    for pair in bytes.chunks_exact(2) {
        let hi = hex_val(pair[0])?;
        let lo = hex_val(pair[1])?;
        out.push((hi << 4) | lo);
    }
    Ok(out)
}

/// True iff the input is entirely hex digits.
pub fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Milliseconds since the unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

fn hex_val(b: u8) -> Result<u8> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        other => Err(StoreError::invariant(format!(
            "invalid hex character '{}'",
            other as char
        ))),
    }
}

fn write_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        // serde_json renders integers as integer literals and floats via
        // ryu's shortest round-trip form, which is exactly the canon.
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(item, out);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push(b'{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_string(key, out);
                out.push(b':');
                // key came from the map, so the entry exists
                if let Some(v) = map.get(key.as_str()) {
                    write_value(v, out);
                }
            }
            out.push(b'}');
        }
    }
}

fn write_string(s: &str, out: &mut Vec<u8>) {
    out.push(b'"');
    for c in s.chars() {
        match c {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\u{08}' => out.extend_from_slice(b"\\b"),
            '\t' => out.extend_from_slice(b"\\t"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\u{0c}' => out.extend_from_slice(b"\\f"),
            '\r' => out.extend_from_slice(b"\\r"),
            c if (c as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}
