// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stable structural digests.
//!
//! Node identity is the digest of its normalized configuration, rendered as canonical JSON
//! (sorted object keys, absent members omitted) and folded with a 31-multiplier string hash
//! over UTF-16 code units. The result only depends on the configuration's content, so it is
//! identical across runs and across independently built nodes.

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde_json::Value;

/// Renders `value` as compact JSON with object keys in sorted order.
pub fn stable_stringify(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_value(out, &map[key]);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Folds a string into a 32-bit digest (`h = h * 31 + unit`, wrapping).
pub fn hash_str(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0_i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Digest of a JSON value's canonical rendering.
pub fn hash_value(value: &Value) -> i32 {
    hash_str(&stable_stringify(value))
}
