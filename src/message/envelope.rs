// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The `LDAPMessage` envelope (RFC 4511 §4.1.1): a SEQUENCE of messageID,
//! a single APPLICATION-tagged `protocolOp` CHOICE, and an optional
//! `[0] Controls`.

use crate::{
    ber::{error::BerError, value::Value},
    message::{control::Control, op::Request},
};

/// A fully decoded client request, ready for dispatch.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub message_id: i64,
    pub request: Request,
    pub controls: Vec<Control>,
}

impl Envelope {
    /// Decode a single BER element into an `Envelope`.
    ///
    /// Rejects messageID 0, which RFC 4511 reserves for unsolicited
    /// notifications the server sends — a client is never allowed to choose
    /// it (`SPEC_FULL.md` §9).
    pub fn decode(value: &Value) -> Result<Self, BerError> {
        let children = value.as_children().ok_or(BerError::MalformedEnvelope("LDAPMessage is not a SEQUENCE"))?;

        let message_id = children
            .first()
            .and_then(|v| v.as_integer())
            .ok_or(BerError::MalformedEnvelope("missing messageID"))?;
        if message_id == 0 {
            return Err(BerError::MalformedEnvelope("messageID 0 is reserved for server notifications"));
        }

        let op_value = children.get(1).ok_or(BerError::MalformedEnvelope("missing protocolOp"))?;
        if op_value.class() != crate::ber::tag::Class::Application {
            return Err(BerError::MalformedEnvelope("protocolOp is not APPLICATION-tagged"));
        }
        let request = Request::decode(op_value.tag_number(), op_value)?;

        let controls = match children.get(2) {
            Some(c) if c.tag_number() == 0 && c.class() == crate::ber::tag::Class::ContextSpecific => {
                Control::decode_list(c)?
            },
            Some(_) => return Err(BerError::MalformedEnvelope("unexpected third element in LDAPMessage")),
            None => Vec::new(),
        };

        Ok(Envelope { message_id, request, controls })
    }
}
