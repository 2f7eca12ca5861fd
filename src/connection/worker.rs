// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Component D: the operation worker. One is spawned per asynchronous
//! request (Search, Modify, Add, Del, ModifyDN, Compare); it calls the
//! handler, turns the outcome into a response PDU, and observes
//! cancellation at every point a response would otherwise be written
//! (`SPEC_FULL.md` §4.4).
//!
//! Bind and Unbind never go through a worker: Bind must run synchronously
//! so later requests observe the new bind state, and Unbind has no response
//! to suppress.

use std::{sync::Arc, time::Duration};

use tokio::{io::AsyncWrite, sync::Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info_span};

use crate::{
    connection::{requests::ActiveRequestTable, writer::{MessageWriter, write_value}},
    handler::{ConnectionInfo, Handler, HandlerError, SearchEntry, SearchSink},
    message::{
        MessageId,
        op::{AddRequest, CompareRequest, DelRequest, ModifyDnRequest, ModifyRequest, SearchRequest},
        result::{LdapResult, ResultCode},
        response,
        Control,
    },
};

/// If `operation_timeout` is set, spawns a self-terminating watchdog that
/// cancels `cancel` once the duration elapses — exactly as Abandon would
/// (`SPEC_FULL.md` §5 "Timeouts"). It never touches the stream itself, only
/// the cooperative cancellation flag, so it carries none of the torn-write
/// risk a forced future-drop would.
fn spawn_timeout_watchdog(operation_timeout: Option<Duration>, cancel: CancellationToken) {
    if let Some(duration) = operation_timeout {
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => cancel.cancel(),
                _ = cancel.cancelled() => {},
            }
        });
    }
}

/// Turns a handler failure into the `LdapResult` a worker writes back,
/// logging the cause. `err.code`, when the handler set one, is reported to
/// the peer verbatim; otherwise the default is the generic
/// `operationsError` (`SPEC_FULL.md` §7).
fn handler_error_to_result(message_id: MessageId, err: HandlerError) -> LdapResult {
    error!(message_id, error = %err.source, code = ?err.code, "handler returned an error");
    LdapResult::error(err.code.unwrap_or(ResultCode::OperationsError), "internal error")
}

/// Streams `SearchResultEntry` PDUs directly to a stream already held under
/// the connection's write lock for the whole search (see `spawn_search`).
/// Stops forwarding once the request is abandoned rather than erroring —
/// the handler may keep iterating, but nothing more reaches the peer.
struct SearchWriterSink<'a, W> {
    stream: AsyncMutex<&'a mut W>,
    message_id: MessageId,
    cancel: CancellationToken,
}

#[async_trait::async_trait]
impl<'a, W: AsyncWrite + Unpin + Send> SearchSink for SearchWriterSink<'a, W> {
    async fn send_entry(&self, entry: SearchEntry) -> Result<(), anyhow::Error> {
        if self.cancel.is_cancelled() {
            return Ok(());
        }
        let value = response::search_result_entry(self.message_id, &entry.object_name, &entry.attributes);
        let mut stream = self.stream.lock().await;
        write_value(&mut **stream, &value).await?;
        Ok(())
    }
}

/// Spawns the worker for a Search request and registers it in `table`. The
/// whole operation — every `SearchResultEntry` plus the final
/// `SearchResultDone` — runs under a single acquisition of the connection's
/// write lock (`SPEC_FULL.md` §4.2's `with_write_lock`), so cancellation is
/// observed cooperatively between writes (at the start of each entry and
/// before the final response) rather than by racing the handler future as a
/// whole: dropping a future mid-`write_all` would tear a PDU in half on the
/// wire, and every later write on the connection after that is corrupt too
/// (`SPEC_FULL.md` §4.4, §8 property 4).
pub fn spawn_search<W, H>(
    message_id: MessageId,
    conn: ConnectionInfo,
    req: SearchRequest,
    controls: Vec<Control>,
    handler: Arc<H>,
    writer: Arc<MessageWriter<W>>,
    table: Arc<ActiveRequestTable>,
    operation_timeout: Option<Duration>,
) where
    W: AsyncWrite + Unpin + Send + Sync + 'static,
    H: Handler + 'static,
{
    let cancel = CancellationToken::new();
    let span = info_span!("operation", message_id, op = "search");
    let task_cancel = cancel.clone();
    let task_writer = writer.clone();
    let task_table = table.clone();
    spawn_timeout_watchdog(operation_timeout, cancel.clone());
    let join = tokio::spawn(
        async move {
            task_writer
                .with_write_lock(move |stream| {
                    Box::pin(async move {
                        let sink = SearchWriterSink {
                            stream: AsyncMutex::new(stream),
                            message_id,
                            cancel: task_cancel.clone(),
                        };
                        let outcome = handler.do_search(&conn, &req, &controls, &sink).await;
                        let stream = sink.stream.into_inner();

                        task_table.remove(message_id);
                        if task_cancel.is_cancelled() {
                            return;
                        }
                        let result = match outcome {
                            Ok(result) => result,
                            Err(err) => handler_error_to_result(message_id, err),
                        };
                        let value = response::search_result_done(message_id, &result);
                        if let Err(err) = write_value(stream, &value).await {
                            error!(message_id, error = %err, "failed to write response");
                        }
                    })
                })
                .await;
        }
        .instrument(span),
    );
    if table.insert(message_id, cancel, join) {
        error!(message_id, "reused an in-flight message id for search request, discarding the prior worker's slot");
    }
}

macro_rules! simple_worker {
    ($name:ident, $req_ty:ty, $do_fn:ident, $builder:path, $op:literal) => {
        pub fn $name<W, H>(
            message_id: MessageId,
            conn: ConnectionInfo,
            req: $req_ty,
            controls: Vec<Control>,
            handler: Arc<H>,
            writer: Arc<MessageWriter<W>>,
            table: Arc<ActiveRequestTable>,
            operation_timeout: Option<Duration>,
        ) where
            W: AsyncWrite + Unpin + Send + Sync + 'static,
            H: Handler + 'static,
        {
            let cancel = CancellationToken::new();
            let span = info_span!("operation", message_id, op = $op);
            let task_cancel = cancel.clone();
            let task_writer = writer.clone();
            let task_table = table.clone();
            spawn_timeout_watchdog(operation_timeout, cancel.clone());
            let join = tokio::spawn(
                async move {
                    let outcome = tokio::select! {
                        biased;
                        _ = task_cancel.cancelled() => None,
                        result = handler.$do_fn(&conn, &req, &controls) => Some(result),
                    };
                    finish(message_id, &task_cancel, &task_writer, &task_table, outcome, $builder).await;
                }
                .instrument(span),
            );
            if table.insert(message_id, cancel, join) {
                error!(message_id, concat!("reused an in-flight message id for ", $op, " request, discarding the prior worker's slot"));
            }
        }
    };
}

simple_worker!(spawn_modify, ModifyRequest, do_modify, response::modify_response, "modify");
simple_worker!(spawn_add, AddRequest, do_add, response::add_response, "add");
simple_worker!(spawn_del, DelRequest, do_del, response::del_response, "del");
simple_worker!(spawn_modify_dn, ModifyDnRequest, do_modify_dn, response::modify_dn_response, "modify_dn");
simple_worker!(spawn_compare, CompareRequest, do_compare, response::compare_response, "compare");

/// Common tail shared by the non-streaming workers: remove from the table,
/// and unless the request was abandoned, turn the handler outcome into a
/// response and write it through the ordinary per-write lock acquisition —
/// safe here because each of these operations ever writes exactly once.
async fn finish<W: AsyncWrite + Unpin + Send>(
    message_id: MessageId,
    cancel: &CancellationToken,
    writer: &MessageWriter<W>,
    table: &ActiveRequestTable,
    outcome: Option<Result<LdapResult, HandlerError>>,
    builder: fn(MessageId, &LdapResult) -> crate::ber::value::Value,
) {
    table.remove(message_id);

    if cancel.is_cancelled() {
        return;
    }

    let result = match outcome {
        Some(Ok(result)) => result,
        Some(Err(err)) => handler_error_to_result(message_id, err),
        None => return,
    };

    let value = builder(message_id, &result);
    if let Err(err) = writer.write_frame(&value).await {
        error!(message_id, error = %err, "failed to write response");
    }
}
