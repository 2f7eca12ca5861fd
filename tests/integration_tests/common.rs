// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use async_trait::async_trait;
use ldap_protocol_engine::{
    handler::{BindOutcome, ConnectionInfo, Handler, HandlerError, SearchEntry, SearchSink},
    message::{
        Control,
        op::{AddRequest, CompareRequest, DelRequest, ModifyDnRequest, ModifyRequest, SearchRequest},
        result::{LdapResult, ResultCode},
    },
};

/// A fixed two-entry directory used by every scenario in this file.
pub struct TestHandler;

#[async_trait]
impl Handler for TestHandler {
    async fn do_bind(
        &self,
        _conn: &ConnectionInfo,
        name: &str,
        credentials: &[u8],
        _controls: &[Control],
    ) -> Result<BindOutcome, HandlerError> {
        if name == "cn=admin,dc=example,dc=com" && credentials == b"secret" {
            Ok(BindOutcome { result: LdapResult::success(), server_sasl_creds: None })
        } else {
            Ok(BindOutcome {
                result: LdapResult::error(ResultCode::InvalidCredentials, "bad credentials"),
                server_sasl_creds: None,
            })
        }
    }

    async fn do_search(
        &self,
        _conn: &ConnectionInfo,
        _req: &SearchRequest,
        _controls: &[Control],
        sink: &(dyn SearchSink),
    ) -> Result<LdapResult, HandlerError> {
        sink.send_entry(SearchEntry {
            object_name: "uid=alice,dc=example,dc=com".to_string(),
            attributes: vec![("cn".to_string(), vec![b"Alice".to_vec()])],
        })
        .await
        .map_err(HandlerError::from)?;
        sink.send_entry(SearchEntry {
            object_name: "uid=bob,dc=example,dc=com".to_string(),
            attributes: vec![("cn".to_string(), vec![b"Bob".to_vec()])],
        })
        .await
        .map_err(HandlerError::from)?;
        Ok(LdapResult::success())
    }

    async fn do_modify(
        &self,
        _conn: &ConnectionInfo,
        _req: &ModifyRequest,
        _controls: &[Control],
    ) -> Result<LdapResult, HandlerError> {
        Ok(LdapResult::success())
    }

    async fn do_add(
        &self,
        _conn: &ConnectionInfo,
        _req: &AddRequest,
        _controls: &[Control],
    ) -> Result<LdapResult, HandlerError> {
        Ok(LdapResult::success())
    }

    async fn do_del(
        &self,
        _conn: &ConnectionInfo,
        _req: &DelRequest,
        _controls: &[Control],
    ) -> Result<LdapResult, HandlerError> {
        Ok(LdapResult::success())
    }

    async fn do_modify_dn(
        &self,
        _conn: &ConnectionInfo,
        _req: &ModifyDnRequest,
        _controls: &[Control],
    ) -> Result<LdapResult, HandlerError> {
        Ok(LdapResult::success())
    }

    async fn do_compare(
        &self,
        _conn: &ConnectionInfo,
        _req: &CompareRequest,
        _controls: &[Control],
    ) -> Result<LdapResult, HandlerError> {
        Ok(LdapResult::success())
    }
}
