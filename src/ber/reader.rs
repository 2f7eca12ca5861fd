// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The BER framing reader: pulls exactly one TLV element's bytes off an
//! async byte stream, without knowing anything about what it decodes to.

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::ber::{error::BerError, length, tag::Tag};

/// Outcome of attempting to frame one element.
#[derive(Debug)]
pub enum Frame {
    /// The full header+content bytes of one TLV element.
    Element(Bytes),
    /// The stream closed cleanly at a TLV boundary (no bytes had been
    /// consumed for a new element yet).
    Eof,
}

/// Framing failure. `UnexpectedEof` means the stream closed *inside* an
/// element — per the framing contract that is still a protocol violation,
/// but sending a notice is pointless since the peer is already gone.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("stream closed mid-element")]
    UnexpectedEof,
    #[error("transport read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Protocol(#[from] BerError),
}

/// Read one BER/DER element off `stream`. `max_size` bounds the declared
/// content length to guard against a hostile or broken peer.
pub async fn read_element<R>(stream: &mut R, max_size: usize) -> Result<Frame, ReadError>
where R: AsyncRead + Unpin {
    let mut first = [0u8; 1];
    let n = stream.read(&mut first).await?;
    if n == 0 {
        return Ok(Frame::Eof);
    }

    let mut elem = vec![first[0]];
    let tag_len = loop {
        match Tag::decode(&elem) {
            Ok((_, consumed)) => break consumed,
            Err(BerError::Truncated { .. }) => read_one_more(stream, &mut elem).await?,
            Err(other) => return Err(ReadError::Protocol(other)),
        }
    };

    let (declared_len, length_consumed) = loop {
        match length::decode(&elem[tag_len..], max_size) {
            Ok(pair) => break pair,
            Err(BerError::Truncated { .. }) => read_one_more(stream, &mut elem).await?,
            Err(other) => return Err(ReadError::Protocol(other)),
        }
    };

    let header_len = tag_len + length_consumed;
    debug_assert_eq!(elem.len(), header_len);

    if declared_len > 0 {
        let start = elem.len();
        elem.resize(start + declared_len, 0);
        stream
            .read_exact(&mut elem[start..])
            .await
            .map_err(|e| classify_eof(e))?;
    }

    Ok(Frame::Element(Bytes::from(elem)))
}

async fn read_one_more<R>(stream: &mut R, elem: &mut Vec<u8>) -> Result<(), ReadError>
where R: AsyncRead + Unpin {
    let mut byte = [0u8; 1];
    stream
        .read_exact(&mut byte)
        .await
        .map_err(|e| classify_eof(e))?;
    elem.push(byte[0]);
    Ok(())
}

fn classify_eof(e: std::io::Error) -> ReadError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        ReadError::UnexpectedEof
    } else {
        ReadError::Io(e)
    }
}
