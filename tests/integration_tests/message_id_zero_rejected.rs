// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use ldap_protocol_engine::{
    ber::{decode::decode_one, reader::{Frame, read_element}, value::Value, encode::encode},
    cfg::config::Limits,
    connection::Connection,
    message::op::{NOTICE_OF_DISCONNECTION_OID, tag},
};
use tokio::io::AsyncWriteExt;

use super::common::TestHandler;

/// RFC 4511 reserves messageID 0 for server-originated unsolicited
/// notifications; a client using it is a protocol violation that earns a
/// Notice-of-Disconnection and a closed connection.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn message_id_zero_triggers_notice_of_disconnection() -> Result<()> {
    let (server_stream, mut client) = tokio::io::duplex(8192);
    let handler = Arc::new(TestHandler);
    let limits = Limits { max_message_size: 1 << 20, read_timeout: None, operation_timeout: None };
    let conn = Connection::new("127.0.0.1:0".parse().context("peer addr")?, limits, handler);

    let server = tokio::spawn(async move { conn.run(server_stream).await });

    let op = Value::application_primitive(tag::UNBIND_REQUEST, vec![]);
    let msg = encode(&Value::sequence(vec![Value::integer(0), op]));
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

    let response_children = children[1].as_children().context("extended response is constructed")?;
    let has_notice_oid = response_children
        .iter()
        .any(|v| v.as_utf8() == Some(NOTICE_OF_DISCONNECTION_OID));
    assert!(has_notice_oid, "expected responseName to be the Notice-of-Disconnection OID");

    // Connection should now be closed: further reads return a clean EOF.
    match read_element(&mut client, 1 << 20).await.context("read after notice")? {
        Frame::Eof => {},
        Frame::Element(_) => bail!("expected eof after notice of disconnection"),
    }

    server.await.context("server task panicked")?.context("connection returned an error")?;
    Ok(())
}
