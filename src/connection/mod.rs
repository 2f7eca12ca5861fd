// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Component E: the per-connection dispatch loop. Owns framing, the active
//! request table, bind state, and the tag switch that decides whether a
//! request is answered synchronously (Bind, Unbind, Abandon) or handed to a
//! spawned [`worker`] (everything else) (`SPEC_FULL.md` §4.5).

pub mod requests;
pub mod worker;
pub mod writer;

use std::{net::SocketAddr, sync::Arc};

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{
    ber::{decode::decode_one, reader::{Frame, ReadError, read_element}},
    cfg::config::Limits,
    connection::{requests::ActiveRequestTable, writer::MessageWriter},
    error::EngineError,
    handler::{ConnectionInfo, Handler},
    message::{
        Envelope, MessageId, Request,
        op::{AbandonRequest, BindAuth},
        result::{LdapResult, ResultCode},
        response,
    },
};

/// What RFC 4511 calls the bind state of a connection: unauthenticated
/// (anonymous access, handler's call), or bound as a given DN at a given
/// protocol version.
#[derive(Debug, Clone)]
enum ConnectionState {
    Unbound,
    Bound { dn: String, version: i64 },
}

impl ConnectionState {
    fn to_info(&self, peer_addr: SocketAddr) -> ConnectionInfo {
        match self {
            ConnectionState::Unbound => {
                ConnectionInfo { peer_addr, bound_dn: None, protocol_version: 3 }
            },
            ConnectionState::Bound { dn, version } => {
                ConnectionInfo { peer_addr, bound_dn: Some(dn.clone()), protocol_version: *version }
            },
        }
    }
}

/// Drives one accepted connection end to end: reads framed elements,
/// decodes envelopes, dispatches requests, and tears everything down
/// cleanly on EOF, transport failure, or protocol violation.
pub struct Connection<H: Handler> {
    peer_addr: SocketAddr,
    limits: Limits,
    handler: Arc<H>,
}

impl<H: Handler + 'static> Connection<H> {
    pub fn new(peer_addr: SocketAddr, limits: Limits, handler: Arc<H>) -> Self {
        Self { peer_addr, limits, handler }
    }

    /// Runs the dispatch loop to completion. Returns once the connection is
    /// fully torn down: every spawned worker has been cancelled and joined,
    /// and (if bound) the handler has been notified.
    pub async fn run<S>(&self, stream: S) -> Result<(), EngineError>
    where S: AsyncRead + AsyncWrite + Unpin + Send + 'static {
        let span = info_span!("connection", peer = %self.peer_addr);
        self.run_inner(stream).instrument(span).await
    }

    async fn run_inner<S>(&self, stream: S) -> Result<(), EngineError>
    where S: AsyncRead + AsyncWrite + Unpin + Send + 'static {
        let (mut read_half, write_half) = tokio::io::split(stream);
        let writer = Arc::new(MessageWriter::new(write_half));
        let table = Arc::new(ActiveRequestTable::new());
        let mut state = ConnectionState::Unbound;

        info!("connection accepted");

        loop {
            let frame = match self.read_frame(&mut read_half).await {
                Ok(frame) => frame,
                Err(ReadError::UnexpectedEof) => {
                    debug!("stream closed mid-element");
                    break;
                },
                Err(ReadError::Io(e)) => {
                    debug!(error = %e, "transport error on read");
                    break;
                },
                Err(ReadError::Protocol(e)) => {
                    warn!(error = %e, "protocol error while framing element");
                    let result = LdapResult::error(ResultCode::ProtocolError, e.to_string());
                    let _ = writer.send_notice_of_disconnection(&result).await;
                    break;
                },
            };

            let bytes = match frame {
                Frame::Element(bytes) => bytes,
                Frame::Eof => {
                    debug!("clean eof at element boundary");
                    break;
                },
            };

            let value = match decode_one(&bytes, self.limits.max_message_size) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "malformed BER element");
                    let result = LdapResult::error(ResultCode::ProtocolError, e.to_string());
                    let _ = writer.send_notice_of_disconnection(&result).await;
                    break;
                },
            };

            let envelope = match Envelope::decode(&value) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(error = %e, "malformed envelope");
                    let result = LdapResult::error(ResultCode::ProtocolError, e.to_string());
                    let _ = writer.send_notice_of_disconnection(&result).await;
                    break;
                },
            };

            if !self.dispatch(envelope, &mut state, &writer, &table).await {
                break;
            }
        }

        table.cancel_all();
        table.join_all().await;

        if let ConnectionState::Bound { .. } = &state {
            let info = state.to_info(self.peer_addr);
            self.handler.on_unbind(&info).await;
        }

        info!("connection closed");
        Ok(())
    }

    /// Reads the next framed BER element, applying `limits.read_timeout` as
    /// an idle-read deadline when configured. An elapsed timeout is folded
    /// into `ReadError::Io` so it takes the same silent-close path as any
    /// other transport failure (`SPEC_FULL.md` §9's `TransportError`).
    async fn read_frame<R>(&self, read_half: &mut R) -> Result<Frame, ReadError>
    where R: AsyncRead + Unpin {
        let read = read_element(read_half, self.limits.max_message_size);
        match self.limits.read_timeout {
            Some(duration) => match tokio::time::timeout(duration, read).await {
                Ok(result) => result,
                Err(_elapsed) => {
                    Err(ReadError::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "idle read timeout elapsed")))
                },
            },
            None => read.await,
        }
    }

    /// Dispatches one decoded envelope. Returns `false` when the connection
    /// loop should stop reading further requests (Unbind).
    async fn dispatch<W>(
        &self,
        envelope: Envelope,
        state: &mut ConnectionState,
        writer: &Arc<MessageWriter<W>>,
        table: &Arc<ActiveRequestTable>,
    ) -> bool
    where
        W: AsyncWrite + Unpin + Send + Sync + 'static,
    {
        let message_id: MessageId = envelope.message_id;
        let controls = envelope.controls;

        match envelope.request {
            Request::Bind(bind) => {
                // RFC 4511 §4.2: a Bind abandons every outstanding operation
                // on the connection before it's processed.
                table.cancel_all();
                table.join_all().await;

                let info = state.to_info(self.peer_addr);
                let credentials = match &bind.auth {
                    BindAuth::Simple(bytes) => bytes.clone(),
                    BindAuth::Sasl { credentials, .. } => credentials.clone().unwrap_or_default(),
                };

                match self.handler.do_bind(&info, &bind.name, &credentials, &controls).await {
                    Ok(outcome) => {
                        if outcome.result.code.code() == ResultCode::Success.code() {
                            *state = ConnectionState::Bound { dn: bind.name.clone(), version: bind.version };
                        }
                        let value =
                            response::bind_response(message_id, &outcome.result, outcome.server_sasl_creds.as_deref());
                        if let Err(e) = writer.write_frame(&value).await {
                            warn!(error = %e, "failed to write bind response");
                            return false;
                        }
                    },
                    Err(e) => {
                        warn!(error = %e.source, code = ?e.code, "bind handler failed");
                        let result = LdapResult::error(e.code.unwrap_or(ResultCode::OperationsError), "internal error");
                        let value = response::bind_response(message_id, &result, None);
                        let _ = writer.write_frame(&value).await;
                    },
                }
                true
            },

            Request::Unbind(_) => {
                table.cancel_all();
                table.join_all().await;
                false
            },

            Request::Abandon(AbandonRequest(target)) => {
                table.cancel(target);
                true
            },

            Request::Search(req) => {
                let info = state.to_info(self.peer_addr);
                worker::spawn_search(
                    message_id,
                    info,
                    req,
                    controls,
                    self.handler.clone(),
                    writer.clone(),
                    table.clone(),
                    self.limits.operation_timeout,
                );
                true
            },

            Request::Modify(req) => {
                let info = state.to_info(self.peer_addr);
                worker::spawn_modify(
                    message_id,
                    info,
                    req,
                    controls,
                    self.handler.clone(),
                    writer.clone(),
                    table.clone(),
                    self.limits.operation_timeout,
                );
                true
            },

            Request::Add(req) => {
                let info = state.to_info(self.peer_addr);
                worker::spawn_add(
                    message_id,
                    info,
                    req,
                    controls,
                    self.handler.clone(),
                    writer.clone(),
                    table.clone(),
                    self.limits.operation_timeout,
                );
                true
            },

            Request::Del(req) => {
                let info = state.to_info(self.peer_addr);
                worker::spawn_del(
                    message_id,
                    info,
                    req,
                    controls,
                    self.handler.clone(),
                    writer.clone(),
                    table.clone(),
                    self.limits.operation_timeout,
                );
                true
            },

            Request::ModifyDn(req) => {
                let info = state.to_info(self.peer_addr);
                worker::spawn_modify_dn(
                    message_id,
                    info,
                    req,
                    controls,
                    self.handler.clone(),
                    writer.clone(),
                    table.clone(),
                    self.limits.operation_timeout,
                );
                true
            },

            Request::Compare(req) => {
                let info = state.to_info(self.peer_addr);
                worker::spawn_compare(
                    message_id,
                    info,
                    req,
                    controls,
                    self.handler.clone(),
                    writer.clone(),
                    table.clone(),
                    self.limits.operation_timeout,
                );
                true
            },
        }
    }
}
