// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The `LDAPResult` sequence (RFC 4511 §4.1.9) that terminates every
//! operation except Search (which wraps it in SearchResultDone) and the
//! handful of operations that produce no response at all (Unbind, Abandon).

use crate::ber::value::Value;

/// The closed set of LDAP result codes the engine itself ever needs to
/// produce or that a handler commonly wants to return. This is not the full
/// RFC 4511 Appendix A taxonomy — textual rendering of the complete table is
/// explicitly out of scope (see `SPEC_FULL.md` §1) — but every code the core
/// or a typical handler needs is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum ResultCode {
    Success = 0,
    OperationsError = 1,
    ProtocolError = 2,
    TimeLimitExceeded = 3,
    SizeLimitExceeded = 4,
    CompareFalse = 5,
    CompareTrue = 6,
    AuthMethodNotSupported = 7,
    AdminLimitExceeded = 11,
    NoSuchAttribute = 16,
    InvalidAttributeSyntax = 21,
    NoSuchObject = 32,
    InvalidDnSyntax = 34,
    InappropriateAuthentication = 48,
    InvalidCredentials = 49,
    InsufficientAccessRights = 50,
    Busy = 51,
    Unavailable = 52,
    UnwillingToPerform = 53,
    NamingViolation = 64,
    ObjectClassViolation = 65,
    EntryAlreadyExists = 68,
    Other = 80,
}

impl ResultCode {
    pub fn code(self) -> i64 {
        self as i64
    }
}

/// An outcome the core knows how to serialize without understanding what
/// produced it: the `resultCode`/`matchedDN`/`errorMessage`/`referral` tuple
/// shared by every non-Bind, non-Search terminal response, by
/// SearchResultDone, and by unsolicited notifications.
#[derive(Debug, Clone)]
pub struct LdapResult {
    pub code: ResultCode,
    pub matched_dn: String,
    pub message: String,
    pub referral: Option<Vec<String>>,
}

impl LdapResult {
    pub fn success() -> Self {
        Self { code: ResultCode::Success, matched_dn: String::new(), message: String::new(), referral: None }
    }

    pub fn error(code: ResultCode, message: impl Into<String>) -> Self {
        Self { code, matched_dn: String::new(), message: message.into(), referral: None }
    }

    /// Encode as the bare `LDAPResult` sequence body (without the
    /// APPLICATION wrapper tag, which callers add per response type).
    pub fn to_children(&self) -> Vec<Value> {
        let mut children = vec![
            Value::enumerated(self.code.code()),
            Value::octet_string(self.matched_dn.clone().into_bytes()),
            Value::octet_string(self.message.clone().into_bytes()),
        ];
        if let Some(referral) = &self.referral {
            let refs = referral.iter().map(|r| Value::octet_string(r.clone().into_bytes())).collect();
            children.push(Value::context_constructed(3, refs));
        }
        children
    }
}
