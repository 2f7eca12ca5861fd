// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ldap_protocol_engine::{
    cfg::{cli::resolve_config_path, config::Config, logger::init_logger},
    connection::Connection,
    handler::{BindOutcome, ConnectionInfo, Handler, HandlerError, SearchSink},
    message::{
        Control,
        op::{AddRequest, CompareRequest, DelRequest, ModifyDnRequest, ModifyRequest, SearchRequest},
        result::{LdapResult, ResultCode},
    },
};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// A minimal handler that accepts any simple bind and answers every other
/// operation with `unwillingToPerform`. Demonstrates how a real backend
/// plugs into the engine; ships nothing resembling a directory itself.
struct NullHandler;

#[async_trait]
impl Handler for NullHandler {
    async fn do_bind(
        &self,
        _conn: &ConnectionInfo,
        _name: &str,
        _credentials: &[u8],
        _controls: &[Control],
    ) -> Result<BindOutcome, HandlerError> {
        Ok(BindOutcome { result: LdapResult::success(), server_sasl_creds: None })
    }

    async fn do_search(
        &self,
        _conn: &ConnectionInfo,
        _req: &SearchRequest,
        _controls: &[Control],
        _sink: &(dyn SearchSink),
    ) -> Result<LdapResult, HandlerError> {
        Ok(LdapResult::success())
    }

    async fn do_modify(
        &self,
        _conn: &ConnectionInfo,
        _req: &ModifyRequest,
        _controls: &[Control],
    ) -> Result<LdapResult, HandlerError> {
        Ok(LdapResult::error(ResultCode::UnwillingToPerform, "read-only server"))
    }

    async fn do_add(
        &self,
        _conn: &ConnectionInfo,
        _req: &AddRequest,
        _controls: &[Control],
    ) -> Result<LdapResult, HandlerError> {
        Ok(LdapResult::error(ResultCode::UnwillingToPerform, "read-only server"))
    }

    async fn do_del(
        &self,
        _conn: &ConnectionInfo,
        _req: &DelRequest,
        _controls: &[Control],
    ) -> Result<LdapResult, HandlerError> {
        Ok(LdapResult::error(ResultCode::UnwillingToPerform, "read-only server"))
    }

    async fn do_modify_dn(
        &self,
        _conn: &ConnectionInfo,
        _req: &ModifyDnRequest,
        _controls: &[Control],
    ) -> Result<LdapResult, HandlerError> {
        Ok(LdapResult::error(ResultCode::UnwillingToPerform, "read-only server"))
    }

    async fn do_compare(
        &self,
        _conn: &ConnectionInfo,
        _req: &CompareRequest,
        _controls: &[Control],
    ) -> Result<LdapResult, HandlerError> {
        Ok(LdapResult::error(ResultCode::CompareFalse, ""))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = resolve_config_path("config/server.yaml")
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    let _logger_guard = init_logger(&cfg.logger)?;

    let handler = Arc::new(NullHandler);
    let listener = TcpListener::bind("0.0.0.0:389").await.context("failed to bind listener")?;
    info!("listening on 0.0.0.0:389");

    loop {
        let (stream, peer_addr) = listener.accept().await.context("accept failed")?;
        let handler = handler.clone();
        let limits = cfg.limits.clone();

        tokio::spawn(async move {
            let conn = Connection::new(peer_addr, limits, handler);
            if let Err(e) = conn.run(stream).await {
                warn!(error = %e, "connection ended with error");
            }
        });
    }
}
