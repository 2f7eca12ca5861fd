// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Engine-level error taxonomy (`SPEC_FULL.md` §7): transport failures,
//! malformed protocol data, and handler failures are distinguished because
//! each drives a different response — close silently, send a
//! Notice-of-Disconnection and close, or emit an `operationsError` and keep
//! the connection open.

use thiserror::Error;

use crate::ber::BerError;

/// Top-level failure of the connection engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The peer sent bytes that don't parse as a well-formed LDAP envelope,
    /// or an envelope referencing an unsupported operation. Per `SPEC_FULL.md`
    /// §4.5/§9, the engine replies with a Notice-of-Disconnection and closes.
    #[error("protocol error: {0}")]
    Protocol(#[from] BerError),

    /// The handler returned an error for a request that expects a response.
    /// Carries the underlying cause for logging; the wire response is always
    /// a generic `operationsError`.
    #[error("handler error: {0}")]
    Handler(#[source] anyhow::Error),

    /// The read/write half of the transport failed. No attempt is made to
    /// notify the peer; the connection is simply dropped.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

/// Distinguishes a genuine failure from the cooperative-cancellation signal
/// a worker observes when its [`tokio_util::sync::CancellationToken`] fires.
/// This is not an error: Abandon succeeding is the expected outcome, and the
/// worker must suppress any response rather than report one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abandoned;

impl std::fmt::Display for Abandoned {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("operation abandoned")
    }
}
