//! Canonical JSON encoding
//!
//! Sorted keys at every level, `,`/`:` separators with no whitespace, UTF-8
//! with non-ASCII characters written literally. Object keys are sorted here
//! rather than relying on the map type, so the output does not change if
//! `serde_json` is built with `preserve_order`. Numbers are written with
//! the exact text they were parsed from (`arbitrary_precision`), so values
//! beyond the 64-bit range stay distinct.

use serde_json::Value;

/// Encode a value into its canonical byte form
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);
    write_value(value, &mut out);
    out
}

/// Encode a value into its canonical string form
pub fn canonical_string(value: &Value) -> String {
    // write_value only emits valid UTF-8
    String::from_utf8_lossy(&canonical_bytes(value)).into_owned()
}

fn write_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_string(key, out);
                out.push(b':');
                write_value(item, out);
            }
            out.push(b'}');
        }
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
        Value::String(s) => write_string(s, out),
        // Scalars have exactly one compact rendering
        scalar => out.extend_from_slice(scalar.to_string().as_bytes()),
    }
}

fn write_string(s: &str, out: &mut Vec<u8>) {
    out.extend_from_slice(Value::String(s.to_owned()).to_string().as_bytes());
}
