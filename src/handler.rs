// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Component G: the external `Handler` interface. The engine owns protocol
//! framing, dispatch and cancellation; everything about what a Bind, Search
//! or Modify *means* lives behind this trait in whatever backend the caller
//! plugs in (`SPEC_FULL.md` §6).

use std::net::SocketAddr;

use async_trait::async_trait;

use crate::message::{
    control::Control,
    op::{AddRequest, CompareRequest, DelRequest, ModifyDnRequest, ModifyRequest, SearchRequest},
    result::{LdapResult, ResultCode},
};

/// Connection-scoped facts a handler may need but that the engine, not the
/// handler, owns the lifecycle of.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub peer_addr: SocketAddr,
    /// `None` until a successful Bind; carries the bound DN afterward.
    pub bound_dn: Option<String>,
    pub protocol_version: i64,
}

/// What a successful Bind changes about connection state. Authentication
/// failure is reported through `LdapResult`'s error code instead, leaving
/// the connection `Unbound` (`SPEC_FULL.md` §9).
#[derive(Debug, Clone)]
pub struct BindOutcome {
    pub result: LdapResult,
    /// Present only for a successful SASL bind step that produced
    /// `serverSaslCreds`.
    pub server_sasl_creds: Option<Vec<u8>>,
}

/// One `SearchResultEntry`'s attributes, streamed to the caller as they're
/// produced rather than collected up front.
pub struct SearchEntry {
    pub object_name: String,
    pub attributes: Vec<(String, Vec<Vec<u8>>)>,
}

/// A channel-like sink a handler streams `SearchResultEntry` values into
/// before returning the final `LDAPResult` for `SearchResultDone`. The
/// engine is responsible for serializing each entry under the write lock and
/// for stopping delivery once the request is abandoned.
#[async_trait]
pub trait SearchSink: Send + Sync {
    async fn send_entry(&self, entry: SearchEntry) -> Result<(), anyhow::Error>;
}

/// A handler-raised failure. `code`, when set, is reported to the peer
/// verbatim (so a handler can fail a search with `noSuchObject` rather than
/// the generic `operationsError`); when unset the worker defaults to
/// `operationsError`. Bind is the one exception: its failures are reported
/// as an ordinary `LdapResult` error code, never as a `HandlerError`.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct HandlerError {
    #[source]
    pub source: anyhow::Error,
    pub code: Option<ResultCode>,
}

impl HandlerError {
    /// Fails the operation with an explicit result code instead of the
    /// generic `operationsError` default.
    pub fn with_code(code: ResultCode, source: anyhow::Error) -> Self {
        Self { source, code: Some(code) }
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(source: anyhow::Error) -> Self {
        Self { source, code: None }
    }
}

/// The backend a [`crate::connection::Connection`] dispatches decoded
/// requests to. Implementations are shared across all connections via
/// `Arc` and must be safe to call concurrently from many connection tasks
/// and, within one connection, many operation workers at once.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn do_bind(
        &self,
        conn: &ConnectionInfo,
        name: &str,
        credentials: &[u8],
        controls: &[Control],
    ) -> Result<BindOutcome, HandlerError>;

    async fn do_search(
        &self,
        conn: &ConnectionInfo,
        req: &SearchRequest,
        controls: &[Control],
        sink: &(dyn SearchSink),
    ) -> Result<LdapResult, HandlerError>;

    async fn do_modify(
        &self,
        conn: &ConnectionInfo,
        req: &ModifyRequest,
        controls: &[Control],
    ) -> Result<LdapResult, HandlerError>;

    async fn do_add(
        &self,
        conn: &ConnectionInfo,
        req: &AddRequest,
        controls: &[Control],
    ) -> Result<LdapResult, HandlerError>;

    async fn do_del(
        &self,
        conn: &ConnectionInfo,
        req: &DelRequest,
        controls: &[Control],
    ) -> Result<LdapResult, HandlerError>;

    async fn do_modify_dn(
        &self,
        conn: &ConnectionInfo,
        req: &ModifyDnRequest,
        controls: &[Control],
    ) -> Result<LdapResult, HandlerError>;

    async fn do_compare(
        &self,
        conn: &ConnectionInfo,
        req: &CompareRequest,
        controls: &[Control],
    ) -> Result<LdapResult, HandlerError>;

    /// Called when a connection is bound and then unbinds or disconnects.
    /// Infallible: there is no response to carry a failure back on.
    async fn on_unbind(&self, conn: &ConnectionInfo) {
        let _ = conn;
    }
}
