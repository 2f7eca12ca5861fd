// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! LDAPv3 message types (RFC 4511 §4): the envelope, controls, requests,
//! response builders, and the `LDAPResult` sequence they share.

pub mod control;
pub mod envelope;
pub mod op;
pub mod response;
pub mod result;

pub use control::Control;
pub use envelope::Envelope;
pub use op::Request;
pub use result::{LdapResult, ResultCode};

/// Type alias matching RFC 4511's `MessageID ::= INTEGER (0 .. maxInt)`. The
/// engine treats IDs as plain 64-bit signed integers (`SPEC_FULL.md` §3).
pub type MessageId = i64;
