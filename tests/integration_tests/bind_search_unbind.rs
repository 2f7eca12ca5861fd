// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use ldap_protocol_engine::{
    ber::{decode::decode_one, encode::encode, reader::{Frame, read_element}, value::Value},
    cfg::config::Limits,
    connection::Connection,
    message::op::tag,
};
use tokio::io::AsyncWriteExt;

use super::common::TestHandler;

fn bind_message(message_id: i64, name: &str, password: &[u8]) -> Vec<u8> {
    let op = Value::application_constructed(
        tag::BIND_REQUEST,
        vec![Value::integer(3), Value::octet_string(name.as_bytes().to_vec()), Value::context_primitive(0, password.to_vec())],
    );
    encode(&Value::sequence(vec![Value::integer(message_id), op]))
}

fn search_message(message_id: i64) -> Vec<u8> {
    let op = Value::application_constructed(
        tag::SEARCH_REQUEST,
        vec![
            Value::octet_string(b"dc=example,dc=com".to_vec()),
            Value::integer(2),
            Value::integer(0),
            Value::integer(0),
            Value::integer(0),
            Value::boolean(false),
            Value::context_primitive(7, b"objectClass".to_vec()),
            Value::sequence(vec![]),
        ],
    );
    encode(&Value::sequence(vec![Value::integer(message_id), op]))
}

fn unbind_message(message_id: i64) -> Vec<u8> {
    let op = Value::application_primitive(tag::UNBIND_REQUEST, vec![]);
    encode(&Value::sequence(vec![Value::integer(message_id), op]))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bind_then_search_then_unbind() -> Result<()> {
    let (server_stream, mut client) = tokio::io::duplex(8192);
    let handler = Arc::new(TestHandler);
    let limits = Limits { max_message_size: 1 << 20, read_timeout: None, operation_timeout: None };
    let conn = Connection::new("127.0.0.1:0".parse().context("peer addr")?, limits, handler);

    let server = tokio::spawn(async move { conn.run(server_stream).await });

    client.write_all(&bind_message(1, "cn=admin,dc=example,dc=com", b"secret")).await?;
    let frame = read_element(&mut client, 1 << 20).await.context("read bind response")?;
    let bytes = match frame {
        Frame::Element(b) => b,
        Frame::Eof => bail!("unexpected eof waiting for bind response"),
    };
    let value = decode_one(&bytes, usize::MAX).context("decode bind response")?;
    let children = value.as_children().context("envelope is a sequence")?;
    assert_eq!(children[0].as_integer(), Some(1));
    assert_eq!(children[1].tag_number(), tag::BIND_RESPONSE);

    client.write_all(&search_message(2)).await?;

    let mut entries = 0;
    loop {
        let frame = read_element(&mut client, 1 << 20).await.context("read search response")?;
        let bytes = match frame {
            Frame::Element(b) => b,
            Frame::Eof => bail!("unexpected eof during search"),
        };
        let value = decode_one(&bytes, usize::MAX).context("decode search response")?;
        let children = value.as_children().context("envelope is a sequence")?;
        match children[1].tag_number() {
            t if t == tag::SEARCH_RESULT_ENTRY => entries += 1,
            t if t == tag::SEARCH_RESULT_DONE => break,
            other => bail!("unexpected tag {other}"),
        }
    }
    assert_eq!(entries, 2);

    client.write_all(&unbind_message(3)).await?;
    drop(client);

    server.await.context("server task panicked")?.context("connection returned an error")?;
    Ok(())
}
