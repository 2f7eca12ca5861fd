// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Component C: the active request table. Tracks every in-flight
//! asynchronous operation by Message ID so Abandon can cancel it and Unbind
//! (or connection teardown) can cancel everything at once
//! (`SPEC_FULL.md` §4.3).

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::message::MessageId;

/// What the table tracks for one in-flight worker: its cancellation token
/// (for Abandon) and the `JoinHandle` (so cancel_all can wait for
/// teardown without leaking tasks).
pub struct WorkerHandle {
    pub cancel: CancellationToken,
    pub join: JoinHandle<()>,
}

/// A concurrent Message-ID → worker map. `DashMap` gives the table's
/// `insert`/`remove` the atomicity the spec requires without a
/// connection-wide lock serializing unrelated operations.
#[derive(Default)]
pub struct ActiveRequestTable {
    inner: DashMap<MessageId, WorkerHandle>,
}

impl ActiveRequestTable {
    pub fn new() -> Self {
        Self { inner: DashMap::new() }
    }

    /// Registers a newly spawned worker. Reusing an in-flight Message ID is
    /// a client error RFC 4511 leaves undefined (`SPEC_FULL.md` §4.3, §9):
    /// the engine's resolution is last-writer-wins, silently discarding the
    /// previous entry without cancelling its worker. Returns `true` if a
    /// prior entry for this `message_id` was overwritten, purely so the
    /// caller can log it.
    pub fn insert(&self, message_id: MessageId, cancel: CancellationToken, join: JoinHandle<()>) -> bool {
        self.inner.insert(message_id, WorkerHandle { cancel, join }).is_some()
    }

    /// Called by a worker (or the dispatch loop) once a request's response
    /// has been sent and it no longer needs to be cancellable. Idempotent:
    /// removing an already-removed ID is a no-op.
    pub fn remove(&self, message_id: MessageId) {
        self.inner.remove(&message_id);
    }

    /// Signals cancellation for one in-flight request. Returns `true` if it
    /// was found (it may still race the worker's natural completion —
    /// that's fine, cancellation is advisory past the point of no return).
    pub fn cancel(&self, message_id: MessageId) -> bool {
        match self.inner.get(&message_id) {
            Some(handle) => {
                handle.cancel.cancel();
                true
            },
            None => false,
        }
    }

    /// Cancels every in-flight request. Used on Bind (RFC 4511 §4.2 requires
    /// outstanding operations be abandoned before the new Bind proceeds) and
    /// on connection teardown.
    pub fn cancel_all(&self) {
        for entry in self.inner.iter() {
            entry.cancel.cancel();
        }
    }

    /// Awaits every currently tracked worker's task, draining the table as
    /// each finishes. Used by Unbind/teardown paths that must not return
    /// until nothing is left running.
    pub async fn join_all(&self) {
        let handles: Vec<_> = self
            .inner
            .iter()
            .map(|e| *e.key())
            .collect();
        for id in handles {
            if let Some((_, handle)) = self.inner.remove(&id) {
                let _ = handle.join.await;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
