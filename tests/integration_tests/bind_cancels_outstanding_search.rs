// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use ldap_protocol_engine::{
    ber::{decode::decode_one, encode::encode, reader::{Frame, read_element}, value::Value},
    cfg::config::Limits,
    connection::Connection,
    handler::{BindOutcome, ConnectionInfo, Handler, HandlerError, SearchEntry, SearchSink},
    message::{
        Control,
        op::{AddRequest, CompareRequest, DelRequest, ModifyDnRequest, ModifyRequest, SearchRequest, tag},
        result::LdapResult,
    },
};
use tokio::io::AsyncWriteExt;

/// Paces `do_search` so a second Bind has a real window to land while the
/// first search is still producing entries.
struct SlowSearchHandler;

#[async_trait]
impl Handler for SlowSearchHandler {
    async fn do_bind(
        &self,
        _conn: &ConnectionInfo,
        _name: &str,
        _credentials: &[u8],
        _controls: &[Control],
    ) -> Result<BindOutcome, HandlerError> {
        Ok(BindOutcome { result: LdapResult::success(), server_sasl_creds: None })
    }

    async fn do_search(
        &self,
        _conn: &ConnectionInfo,
        _req: &SearchRequest,
        _controls: &[Control],
        sink: &(dyn SearchSink),
    ) -> Result<LdapResult, HandlerError> {
        for i in 0..5 {
            sink.send_entry(SearchEntry {
                object_name: format!("uid=entry{i},dc=example,dc=com"),
                attributes: vec![],
            })
            .await?;
            tokio::time::sleep(Duration::from_millis(40)).await;
        }
        Ok(LdapResult::success())
    }

    async fn do_modify(
        &self,
        _conn: &ConnectionInfo,
        _req: &ModifyRequest,
        _controls: &[Control],
    ) -> Result<LdapResult, HandlerError> {
        Ok(LdapResult::success())
    }

    async fn do_add(
        &self,
        _conn: &ConnectionInfo,
        _req: &AddRequest,
        _controls: &[Control],
    ) -> Result<LdapResult, HandlerError> {
        Ok(LdapResult::success())
    }

    async fn do_del(
        &self,
        _conn: &ConnectionInfo,
        _req: &DelRequest,
        _controls: &[Control],
    ) -> Result<LdapResult, HandlerError> {
        Ok(LdapResult::success())
    }

    async fn do_modify_dn(
        &self,
        _conn: &ConnectionInfo,
        _req: &ModifyDnRequest,
        _controls: &[Control],
    ) -> Result<LdapResult, HandlerError> {
        Ok(LdapResult::success())
    }

    async fn do_compare(
        &self,
        _conn: &ConnectionInfo,
        _req: &CompareRequest,
        _controls: &[Control],
    ) -> Result<LdapResult, HandlerError> {
        Ok(LdapResult::success())
    }
}

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

/// RFC 4511 §4.2: a Bind abandons every outstanding operation on the
/// connection before it's processed. The outstanding search's
/// `SearchResultDone` must never reach the peer once the Bind lands
/// (`SPEC_FULL.md` §8 scenario 3, testable property 5).
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bind_cancels_an_outstanding_search() -> Result<()> {
    let (server_stream, mut client) = tokio::io::duplex(8192);
    let handler = Arc::new(SlowSearchHandler);
    let limits = Limits { max_message_size: 1 << 20, read_timeout: None, operation_timeout: None };
    let conn = Connection::new("127.0.0.1:0".parse().context("peer addr")?, limits, handler);

    let server = tokio::spawn(async move { conn.run(server_stream).await });

    client.write_all(&bind_message(1, "cn=admin,dc=example,dc=com", b"secret")).await?;
    let frame = read_element(&mut client, 1 << 20).await.context("read first bind response")?;
    let bytes = match frame {
        Frame::Element(b) => b,
        Frame::Eof => bail!("unexpected eof waiting for first bind response"),
    };
    let value = decode_one(&bytes, usize::MAX).context("decode first bind response")?;
    assert_eq!(value.as_children().context("envelope is a sequence")?[1].tag_number(), tag::BIND_RESPONSE);

    client.write_all(&search_message(2)).await?;

    let frame = read_element(&mut client, 1 << 20).await.context("read first search entry")?;
    let bytes = match frame {
        Frame::Element(b) => b,
        Frame::Eof => bail!("unexpected eof waiting for first entry"),
    };
    let value = decode_one(&bytes, usize::MAX).context("decode first entry")?;
    assert_eq!(value.as_children().context("envelope is a sequence")?[1].tag_number(), tag::SEARCH_RESULT_ENTRY);

    client.write_all(&bind_message(3, "cn=admin,dc=example,dc=com", b"secret")).await?;

    // The next frame on the wire must be the second bind's response, not a
    // `SearchResultDone` for the cancelled search.
    let frame = read_element(&mut client, 1 << 20).await.context("read second bind response")?;
    let bytes = match frame {
        Frame::Element(b) => b,
        Frame::Eof => bail!("unexpected eof waiting for second bind response"),
    };
    let value = decode_one(&bytes, usize::MAX).context("decode second bind response")?;
    let children = value.as_children().context("envelope is a sequence")?;
    assert_eq!(children[0].as_integer(), Some(3));
    assert_eq!(children[1].tag_number(), tag::BIND_RESPONSE);

    drop(client);
    server.await.context("server task panicked")?.context("connection returned an error")?;
    Ok(())
}
