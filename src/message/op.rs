// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The closed set of request `protocolOp` tags the engine dispatches on
//! (RFC 4511 §4.2 table), and the typed request structures decoded from
//! them. Everything inside a request that the core doesn't need to inspect
//! (filters, attribute lists, modify changes) is kept as an opaque [`Value`]
//! and handed to the handler untouched.

use crate::ber::{error::BerError, value::Value};

pub mod tag {
    pub const BIND_REQUEST: u32 = 0;
    pub const BIND_RESPONSE: u32 = 1;
    pub const UNBIND_REQUEST: u32 = 2;
    pub const SEARCH_REQUEST: u32 = 3;
    pub const SEARCH_RESULT_ENTRY: u32 = 4;
    pub const SEARCH_RESULT_DONE: u32 = 5;
    pub const MODIFY_REQUEST: u32 = 6;
    pub const MODIFY_RESPONSE: u32 = 7;
    pub const ADD_REQUEST: u32 = 8;
    pub const ADD_RESPONSE: u32 = 9;
    pub const DEL_REQUEST: u32 = 10;
    pub const DEL_RESPONSE: u32 = 11;
    pub const MODIFY_DN_REQUEST: u32 = 12;
    pub const MODIFY_DN_RESPONSE: u32 = 13;
    pub const COMPARE_REQUEST: u32 = 14;
    pub const COMPARE_RESPONSE: u32 = 15;
    pub const ABANDON_REQUEST: u32 = 16;
    pub const EXTENDED_RESPONSE: u32 = 24;
}

/// Notice-of-Disconnection's `responseName` (RFC 4511 §4.4.1).
pub const NOTICE_OF_DISCONNECTION_OID: &str = "1.3.6.1.4.1.1466.20036";

/// Every request tag the engine understands. Built once per envelope by
/// [`Request::decode`] and handed `by value` into sync handling or into the
/// spawned worker (§4.5 of `SPEC_FULL.md`).
#[derive(Debug, Clone)]
pub enum Request {
    Bind(BindRequest),
    Unbind(UnbindRequest),
    Search(SearchRequest),
    Modify(ModifyRequest),
    Add(AddRequest),
    Del(DelRequest),
    ModifyDn(ModifyDnRequest),
    Compare(CompareRequest),
    Abandon(AbandonRequest),
}

impl Request {
    /// Decode the request body given the envelope's protocolOp tag number
    /// and its (already unwrapped) contents.
    pub fn decode(tag_number: u32, value: &Value) -> Result<Self, BerError> {
        match tag_number {
            tag::BIND_REQUEST => Ok(Request::Bind(BindRequest::decode(value)?)),
            tag::UNBIND_REQUEST => Ok(Request::Unbind(UnbindRequest)),
            tag::SEARCH_REQUEST => Ok(Request::Search(SearchRequest::decode(value)?)),
            tag::MODIFY_REQUEST => Ok(Request::Modify(ModifyRequest::decode(value)?)),
            tag::ADD_REQUEST => Ok(Request::Add(AddRequest::decode(value)?)),
            tag::DEL_REQUEST => Ok(Request::Del(DelRequest::decode(value)?)),
            tag::MODIFY_DN_REQUEST => Ok(Request::ModifyDn(ModifyDnRequest::decode(value)?)),
            tag::COMPARE_REQUEST => Ok(Request::Compare(CompareRequest::decode(value)?)),
            tag::ABANDON_REQUEST => Ok(Request::Abandon(AbandonRequest::decode(value)?)),
            other => Err(BerError::UnsupportedOperation(other)),
        }
    }

    /// The APPLICATION tag this request was decoded from.
    pub fn app_tag(&self) -> u32 {
        match self {
            Request::Bind(_) => tag::BIND_REQUEST,
            Request::Unbind(_) => tag::UNBIND_REQUEST,
            Request::Search(_) => tag::SEARCH_REQUEST,
            Request::Modify(_) => tag::MODIFY_REQUEST,
            Request::Add(_) => tag::ADD_REQUEST,
            Request::Del(_) => tag::DEL_REQUEST,
            Request::ModifyDn(_) => tag::MODIFY_DN_REQUEST,
            Request::Compare(_) => tag::COMPARE_REQUEST,
            Request::Abandon(_) => tag::ABANDON_REQUEST,
        }
    }
}

fn child(value: &Value, index: usize) -> Result<&Value, BerError> {
    value
        .as_children()
        .and_then(|c| c.get(index))
        .ok_or(BerError::MalformedEnvelope("missing required field"))
}

fn utf8_child(value: &Value, index: usize) -> Result<String, BerError> {
    child(value, index)?
        .as_utf8()
        .map(str::to_owned)
        .ok_or(BerError::MalformedEnvelope("expected OCTET STRING"))
}

fn int_child(value: &Value, index: usize) -> Result<i64, BerError> {
    child(value, index)?.as_integer().ok_or(BerError::MalformedEnvelope("expected INTEGER"))
}

// ---------------------------------------------------------------------
// Bind
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum BindAuth {
    Simple(Vec<u8>),
    Sasl { mechanism: String, credentials: Option<Vec<u8>> },
}

#[derive(Debug, Clone)]
pub struct BindRequest {
    pub version: i64,
    pub name: String,
    pub auth: BindAuth,
}

impl BindRequest {
    fn decode(value: &Value) -> Result<Self, BerError> {
        let version = int_child(value, 0)?;
        let name = utf8_child(value, 1)?;
        let auth_value = child(value, 2)?;
        let auth = match auth_value.tag_number() {
            0 => BindAuth::Simple(
                auth_value.as_octet_string().map(<[u8]>::to_vec).unwrap_or_default(),
            ),
            3 => {
                let mechanism = utf8_child(auth_value, 0)?;
                let credentials =
                    auth_value.as_children().and_then(|c| c.get(1)).and_then(|v| v.as_octet_string()).map(<[u8]>::to_vec);
                BindAuth::Sasl { mechanism, credentials }
            },
            other => return Err(BerError::UnexpectedTag { tag: other, expected: "BindRequest.authentication" }),
        };
        Ok(BindRequest { version, name, auth })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UnbindRequest;

// ---------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    BaseObject,
    SingleLevel,
    WholeSubtree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerefAliases {
    NeverDerefAliases,
    DerefInSearching,
    DerefFindingBaseObj,
    DerefAlways,
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub base_object: String,
    pub scope: SearchScope,
    pub deref_aliases: DerefAliases,
    pub size_limit: i64,
    pub time_limit: i64,
    pub types_only: bool,
    /// Opaque `Filter` CHOICE; interpreting it is the handler's job.
    pub filter: Value,
    pub attributes: Vec<String>,
}

impl SearchRequest {
    fn decode(value: &Value) -> Result<Self, BerError> {
        let scope = match int_child(value, 1)? {
            0 => SearchScope::BaseObject,
            1 => SearchScope::SingleLevel,
            2 => SearchScope::WholeSubtree,
            _ => return Err(BerError::MalformedEnvelope("invalid search scope")),
        };
        let deref_aliases = match int_child(value, 2)? {
            0 => DerefAliases::NeverDerefAliases,
            1 => DerefAliases::DerefInSearching,
            2 => DerefAliases::DerefFindingBaseObj,
            3 => DerefAliases::DerefAlways,
            _ => return Err(BerError::MalformedEnvelope("invalid derefAliases")),
        };
        let attributes = child(value, 7)?
            .as_children()
            .map(|c| c.iter().filter_map(|v| v.as_utf8().map(str::to_owned)).collect())
            .unwrap_or_default();

        Ok(SearchRequest {
            base_object: utf8_child(value, 0)?,
            scope,
            deref_aliases,
            size_limit: int_child(value, 3)?,
            time_limit: int_child(value, 4)?,
            types_only: child(value, 5)?.as_bool().unwrap_or(false),
            filter: child(value, 6)?.clone(),
            attributes,
        })
    }
}

// ---------------------------------------------------------------------
// Modify / Add / Del / ModifyDN / Compare — the core only needs the DN(s);
// payload semantics belong to the handler.
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ModifyRequest {
    pub object: String,
    /// Opaque `SEQUENCE OF change` — attribute-level modify semantics are
    /// the handler's responsibility.
    pub changes: Value,
}

impl ModifyRequest {
    fn decode(value: &Value) -> Result<Self, BerError> {
        Ok(ModifyRequest { object: utf8_child(value, 0)?, changes: child(value, 1)?.clone() })
    }
}

#[derive(Debug, Clone)]
pub struct AddRequest {
    pub entry: String,
    /// Opaque `AttributeList`.
    pub attributes: Value,
}

impl AddRequest {
    fn decode(value: &Value) -> Result<Self, BerError> {
        Ok(AddRequest { entry: utf8_child(value, 0)?, attributes: child(value, 1)?.clone() })
    }
}

#[derive(Debug, Clone)]
pub struct DelRequest {
    pub dn: String,
}

impl DelRequest {
    fn decode(value: &Value) -> Result<Self, BerError> {
        let dn = value.as_utf8().ok_or(BerError::MalformedEnvelope("DelRequest is not an OCTET STRING"))?;
        Ok(DelRequest { dn: dn.to_owned() })
    }
}

#[derive(Debug, Clone)]
pub struct ModifyDnRequest {
    pub entry: String,
    pub new_rdn: String,
    pub delete_old_rdn: bool,
    pub new_superior: Option<String>,
}

impl ModifyDnRequest {
    fn decode(value: &Value) -> Result<Self, BerError> {
        let new_superior =
            value.as_children().and_then(|c| c.get(3)).and_then(|v| v.as_utf8()).map(str::to_owned);
        Ok(ModifyDnRequest {
            entry: utf8_child(value, 0)?,
            new_rdn: utf8_child(value, 1)?,
            delete_old_rdn: child(value, 2)?.as_bool().unwrap_or(false),
            new_superior,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub entry: String,
    pub attribute_description: String,
    pub assertion_value: Vec<u8>,
}

impl CompareRequest {
    fn decode(value: &Value) -> Result<Self, BerError> {
        let ava = child(value, 1)?;
        Ok(CompareRequest {
            entry: utf8_child(value, 0)?,
            attribute_description: utf8_child(ava, 0)?,
            assertion_value: child(ava, 1)?.as_octet_string().unwrap_or_default().to_vec(),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AbandonRequest(pub i64);

impl AbandonRequest {
    fn decode(value: &Value) -> Result<Self, BerError> {
        value.as_integer().map(AbandonRequest).ok_or(BerError::MalformedEnvelope("AbandonRequest is not an INTEGER"))
    }

    pub fn target(self) -> i64 {
        self.0
    }
}
