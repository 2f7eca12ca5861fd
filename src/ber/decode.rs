// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Parses the raw bytes of a single TLV (as framed by [`crate::ber::reader`])
//! into a structured [`Value`] tree.

use crate::ber::{
    error::BerError,
    length,
    tag::Tag,
    value::{Kind, Value},
};

/// Decode one element from `buf`. `buf` must contain exactly the bytes of a
/// single TLV (as returned by [`crate::ber::reader::read_element`]); trailing
/// bytes are rejected to keep the contract tight for the envelope parser.
pub fn decode_one(buf: &[u8], max_size: usize) -> Result<Value, BerError> {
    let (value, consumed) = decode_element(buf, max_size)?;
    if consumed != buf.len() {
        return Err(BerError::MalformedEnvelope("trailing bytes after element"));
    }
    Ok(value)
}

/// Decode one element from the front of `buf`, returning it along with the
/// number of bytes consumed. Used recursively for constructed content.
pub fn decode_element(buf: &[u8], max_size: usize) -> Result<(Value, usize), BerError> {
    let (tag, tag_len) = Tag::decode(buf)?;
    let (len, len_len) = length::decode(&buf[tag_len..], max_size)?;
    let header_len = tag_len + len_len;

    let content = buf
        .get(header_len..header_len + len)
        .ok_or(BerError::Truncated { expected: len, available: buf.len().saturating_sub(header_len) })?;

    let kind = if tag.constructed {
        let mut children = Vec::new();
        let mut offset = 0;
        while offset < content.len() {
            let (child, consumed) = decode_element(&content[offset..], max_size)?;
            children.push(child);
            offset += consumed;
        }
        Kind::Constructed(children)
    } else {
        Kind::Primitive(content.to_vec())
    };

    Ok((Value { tag, kind }, header_len + len))
}
