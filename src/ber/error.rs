// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

/// Errors raised while framing or decoding a single BER/DER element.
///
/// These are always wire-format problems: a malformed tag, a length that
/// can't be represented, or content that doesn't match the declared type.
/// They carry no I/O cause; see [`crate::error::EngineError::Transport`] for
/// stream failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BerError {
    #[error("indefinite length encoding is not permitted in DER")]
    IndefiniteLength,

    #[error("declared length {declared} exceeds the configured maximum {max}")]
    LengthTooLarge { declared: usize, max: usize },

    #[error("tag number overflowed while decoding long-form tag")]
    TagOverflow,

    #[error("truncated element: expected {expected} more bytes, stream had {available}")]
    Truncated { expected: usize, available: usize },

    #[error("unexpected universal tag {tag} for {expected}")]
    UnexpectedTag { tag: u32, expected: &'static str },

    #[error("invalid boolean encoding: length {0}")]
    InvalidBoolean(usize),

    #[error("invalid integer encoding: empty content")]
    InvalidInteger,

    #[error("invalid NULL encoding: length {0} (expected 0)")]
    InvalidNull(usize),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(&'static str),

    #[error("unsupported protocol operation tag {0}")]
    UnsupportedOperation(u32),
}
