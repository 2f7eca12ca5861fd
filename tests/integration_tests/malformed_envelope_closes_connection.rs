// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use ldap_protocol_engine::{
    ber::{decode::decode_one, reader::{Frame, read_element}, value::Value, encode::encode},
    cfg::config::Limits,
    connection::Connection,
    message::op::tag,
};
use tokio::io::AsyncWriteExt;

use super::common::TestHandler;

/// An envelope whose `protocolOp` uses a tag the engine doesn't recognize
/// is a protocol error, not a silently-ignored operation: the server must
/// reply with a Notice-of-Disconnection and close.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unsupported_operation_tag_closes_connection() -> Result<()> {
    let (server_stream, mut client) = tokio::io::duplex(8192);
    let handler = Arc::new(TestHandler);
    let limits = Limits { max_message_size: 1 << 20, read_timeout: None, operation_timeout: None };
    let conn = Connection::new("127.0.0.1:0".parse().context("peer addr")?, limits, handler);

    let server = tokio::spawn(async move { conn.run(server_stream).await });

    // Tag 30 is not part of the RFC 4511 protocolOp CHOICE.
    let bogus_op = Value::application_primitive(30, vec![]);
    let msg = encode(&Value::sequence(vec![Value::integer(1), bogus_op]));
    client.write_all(&msg).await?;

    let frame = read_element(&mut client, 1 << 20).await.context("read notice")?;
    let bytes = match frame {
        Frame::Element(b) => b,
        Frame::Eof => bail!("expected a notice of disconnection, got eof"),
    };
    let value = decode_one(&bytes, usize::MAX).context("decode notice")?;
    let children = value.as_children().context("envelope is a sequence")?;
    assert_eq!(children[0].as_integer(), Some(0));
    assert_eq!(children[1].tag_number(), tag::EXTENDED_RESPONSE);

    match read_element(&mut client, 1 << 20).await.context("read after notice")? {
        Frame::Eof => {},
        Frame::Element(_) => bail!("expected eof after notice of disconnection"),
    }

    server.await.context("server task panicked")?.context("connection returned an error")?;
    Ok(())
}
