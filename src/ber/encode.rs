// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Mirrors [`crate::ber::decode`]: serializes a [`Value`] tree back into
//! definite-length DER.

use crate::ber::{length, value::{Kind, Value}};

/// Encode `value` to a freshly allocated byte buffer.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

/// Encode `value`, appending to `out`.
pub fn encode_into(value: &Value, out: &mut Vec<u8>) {
    match &value.kind {
        Kind::Primitive(content) => {
            value.tag.encode(out);
            length::encode(content.len(), out);
            out.extend_from_slice(content);
        },
        Kind::Constructed(children) => {
            let mut content = Vec::new();
            for child in children {
                encode_into(child, &mut content);
            }
            value.tag.encode(out);
            length::encode(content.len(), out);
            out.extend_from_slice(&content);
        },
    }
}
