// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! LDAP Controls (RFC 4511 §4.1.11). The core parses them off the wire and
//! hands them to handlers uninterpreted — it has no opinion about any
//! control OID.

use crate::ber::{error::BerError, tag::universal, value::Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub oid: String,
    pub criticality: bool,
    pub value: Option<Vec<u8>>,
}

impl Control {
    pub fn decode(value: &Value) -> Result<Self, BerError> {
        let children = value
            .as_children()
            .ok_or(BerError::MalformedEnvelope("control is not constructed"))?;

        let oid = children
            .first()
            .and_then(|v| v.as_utf8())
            .ok_or(BerError::MalformedEnvelope("control missing OID"))?
            .to_owned();

        let mut criticality = false;
        let mut value_bytes = None;
        for extra in children.iter().skip(1) {
            if extra.tag_number() == universal::BOOLEAN && !extra.is_constructed() {
                criticality = extra.as_bool().unwrap_or(false);
            } else {
                value_bytes = extra.as_octet_string().map(<[u8]>::to_vec);
            }
        }

        Ok(Control { oid, criticality, value: value_bytes })
    }

    pub fn decode_list(value: &Value) -> Result<Vec<Control>, BerError> {
        let children = value
            .as_children()
            .ok_or(BerError::MalformedEnvelope("controls envelope is not constructed"))?;
        children.iter().map(Control::decode).collect()
    }

    pub fn to_value(&self) -> Value {
        let mut children = vec![Value::octet_string(self.oid.clone().into_bytes())];
        if self.criticality {
            children.push(Value::boolean(true));
        }
        if let Some(value) = &self.value {
            children.push(Value::octet_string(value.clone()));
        }
        Value::sequence(children)
    }
}
