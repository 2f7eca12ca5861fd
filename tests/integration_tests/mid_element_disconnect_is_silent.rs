// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use ldap_protocol_engine::{
    ber::{encode::encode, reader::{Frame, read_element}, value::Value},
    cfg::config::Limits,
    connection::Connection,
    message::op::tag,
};
use tokio::io::{AsyncWriteExt, duplex};

use super::common::TestHandler;

/// A peer that vanishes mid-element (TCP reset, crash, ...) looks like an
/// `UnexpectedEof` while reading the frame, not a protocol violation: the
/// server must not waste a Notice-of-Disconnection on a socket the client
/// has already walked away from, it should just drop the connection.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn truncated_element_closes_without_a_notice() -> Result<()> {
    let (server_stream, mut client) = duplex(8192);
    let handler = Arc::new(TestHandler);
    let limits = Limits { max_message_size: 1 << 20, read_timeout: None, operation_timeout: None };
    let conn = Connection::new("127.0.0.1:0".parse().context("peer addr")?, limits, handler);

    let server = tokio::spawn(async move { conn.run(server_stream).await });

    let op = Value::application_constructed(
        tag::BIND_REQUEST,
        vec![Value::integer(3), Value::octet_string(b"cn=admin,dc=example,dc=com".to_vec())],
    );
    let full = encode(&Value::sequence(vec![Value::integer(1), op]));
    // Send only the header and a few content bytes, then half-close the
    // write side. The client can still read whatever the server sends back.
    client.write_all(&full[..full.len() - 4]).await?;
    client.shutdown().await?;

    match read_element(&mut client, 1 << 20).await.context("read after truncated element")? {
        Frame::Eof => {}
        Frame::Element(_) => bail!("server sent a notice of disconnection for a peer that already hung up"),
    }

    server.await.context("server task panicked")?.context("connection returned an error")?;
    Ok(())
}
