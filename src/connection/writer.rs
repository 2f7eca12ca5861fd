// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Component B: the write half. Every response — whether emitted
//! synchronously off the dispatch loop or asynchronously from a worker —
//! goes through one mutex so interleaved writers never tear a PDU in half
//! on the wire (`SPEC_FULL.md` §4.2/§5).

use std::{future::Future, pin::Pin};

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};
use tracing::trace;

use crate::{ber::{encode::encode, value::Value}, message::result::LdapResult, message::response};

/// A scoped closure handed a raw stream by [`MessageWriter::with_write_lock`].
/// Boxed rather than a bare generic closure so it can borrow the stream
/// across `.await` points without requiring unstable async closures.
pub type StreamFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Encodes and writes one PDU to an already-locked stream. Shared by
/// [`MessageWriter::write_frame`] and by callers inside
/// [`MessageWriter::with_write_lock`] that need to write several PDUs
/// without releasing the lock between them.
pub(crate) async fn write_value<W: AsyncWrite + Unpin>(w: &mut W, value: &Value) -> Result<(), std::io::Error> {
    let bytes = encode(value);
    trace!(len = bytes.len(), "writing frame");
    w.write_all(&bytes).await?;
    w.flush().await
}

/// Serializes writes to a single `AsyncWrite` half behind a `tokio::Mutex`.
/// Cloned (via `Arc`) into every worker spawned for a connection.
pub struct MessageWriter<W> {
    inner: Mutex<W>,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { inner: Mutex::new(writer) }
    }

    /// Encode and write one LDAPMessage envelope. Held under the write lock
    /// for the whole call so nothing else can interleave its bytes.
    pub async fn write_frame(&self, value: &Value) -> Result<(), std::io::Error> {
        let mut w = self.inner.lock().await;
        write_value(&mut *w, value).await
    }

    /// Acquires the write lock once and hands `f` the raw stream, holding
    /// the lock for the whole call instead of once per PDU. Used to stream
    /// a worker's own sequence of writes (e.g. `SearchResultEntry`×N plus
    /// the final `SearchResultDone`) as one atomic run (`SPEC_FULL.md`
    /// §4.2).
    pub async fn with_write_lock<F, T>(&self, f: F) -> T
    where F: for<'a> FnOnce(&'a mut W) -> StreamFuture<'a, T> {
        let mut w = self.inner.lock().await;
        f(&mut w).await
    }

    /// Sends `ExtendedResponse` Notice-of-Disconnection (messageID 0) ahead
    /// of closing the connection, per RFC 4511 §4.4.1.
    pub async fn send_notice_of_disconnection(&self, result: &LdapResult) -> Result<(), std::io::Error> {
        let value = response::notice_of_disconnection(result);
        self.write_frame(&value).await
    }
}
