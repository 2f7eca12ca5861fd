// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Component F: the transport boundary. The engine is deliberately agnostic
//! to how a byte stream was obtained — plain TCP, TLS, a Unix socket, or an
//! in-memory duplex pair in tests — as long as it implements this bound
//! (`SPEC_FULL.md` §6).

use tokio::io::{AsyncRead, AsyncWrite};

/// A connected transport the engine can speak LDAP over. `Unpin` lets the
/// engine hold `&mut` halves across `.await` points without pinning
/// boilerplate; `Send` lets the per-connection task move across threads.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}
