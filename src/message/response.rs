// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Builders for every response PDU the engine or a worker can emit. Each
//! function produces the full envelope `Value` (messageID + tagged
//! protocolOp), ready for [`crate::ber::encode::encode`].

use crate::{
    ber::value::Value,
    message::{op::tag, result::LdapResult},
};

fn envelope(message_id: i64, op: Value) -> Value {
    Value::sequence(vec![Value::integer(message_id), op])
}

pub fn bind_response(message_id: i64, result: &LdapResult, server_sasl_creds: Option<&[u8]>) -> Value {
    let mut children = result.to_children();
    if let Some(creds) = server_sasl_creds {
        children.push(Value::context_primitive(7, creds.to_vec()));
    }
    envelope(message_id, Value::application_constructed(tag::BIND_RESPONSE, children))
}

/// One `SearchResultEntry`: an object name plus a `PartialAttributeList`.
pub fn search_result_entry(message_id: i64, object_name: &str, attributes: &[(String, Vec<Vec<u8>>)]) -> Value {
    let attrs = attributes
        .iter()
        .map(|(name, values)| {
            Value::sequence(vec![
                Value::octet_string(name.clone().into_bytes()),
                Value::set(values.iter().map(|v| Value::octet_string(v.clone())).collect()),
            ])
        })
        .collect();
    let op = Value::application_constructed(
        tag::SEARCH_RESULT_ENTRY,
        vec![Value::octet_string(object_name.to_owned().into_bytes()), Value::sequence(attrs)],
    );
    envelope(message_id, op)
}

pub fn search_result_done(message_id: i64, result: &LdapResult) -> Value {
    envelope(message_id, Value::application_constructed(tag::SEARCH_RESULT_DONE, result.to_children()))
}

macro_rules! status_only_response {
    ($name:ident, $tag:path) => {
        pub fn $name(message_id: i64, result: &LdapResult) -> Value {
            envelope(message_id, Value::application_constructed($tag, result.to_children()))
        }
    };
}

status_only_response!(modify_response, tag::MODIFY_RESPONSE);
status_only_response!(add_response, tag::ADD_RESPONSE);
status_only_response!(del_response, tag::DEL_RESPONSE);
status_only_response!(modify_dn_response, tag::MODIFY_DN_RESPONSE);
status_only_response!(compare_response, tag::COMPARE_RESPONSE);

/// An unsolicited notification (messageID=0) or a regular ExtendedResponse,
/// depending on `message_id`. Notice-of-Disconnection is always sent with
/// `message_id = 0` and `response_name = Some(NOTICE_OF_DISCONNECTION_OID)`.
pub fn extended_response(
    message_id: i64,
    result: &LdapResult,
    response_name: Option<&str>,
    response_value: Option<&[u8]>,
) -> Value {
    let mut children = result.to_children();
    if let Some(name) = response_name {
        children.push(Value::context_primitive(10, name.to_owned().into_bytes()));
    }
    if let Some(value) = response_value {
        children.push(Value::context_primitive(11, value.to_vec()));
    }
    envelope(message_id, Value::application_constructed(tag::EXTENDED_RESPONSE, children))
}

pub fn notice_of_disconnection(result: &LdapResult) -> Value {
    extended_response(0, result, Some(super::op::NOTICE_OF_DISCONNECTION_OID), None)
}
