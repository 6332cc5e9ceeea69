//! Framing of requests and responses.
//!
//! Each header field is an ASCII decimal number of at most [MAX_DIGITS] digits terminated by
//! `\n`, optionally preceded by `\r`. Requests carry `mode`, `parallelism` and `size` fields
//! followed by exactly `size` payload bytes; responses carry `status` and `size` fields followed
//! by exactly `size` body bytes. Readers never assume that a field arrives in a single segment.

use std::io;

use derive_getters::{Dissolve, Getters};
use derive_more::Constructor;
use eyre::{Report, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use alignfarm_core_rs::{Fault, Status};

pub const MAX_DIGITS: usize = 20;

/// Longest possible request header: three fields with their terminators.
pub const MAX_HEADER: u64 = 3 * (MAX_DIGITS as u64 + 2);

#[derive(Clone, Debug, PartialEq, Eq, Getters, Dissolve, Constructor)]
pub struct Request {
    mode: u64,
    parallelism: u64,
    payload: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Getters, Dissolve, Constructor)]
pub struct Reply {
    status: Status,
    body: Vec<u8>,
}

fn malformed(reason: String) -> Report {
    Fault::MalformedRequest { reason }.into()
}

fn io_fault(err: io::Error, field: &str) -> Report {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        malformed(format!("connection closed while reading {field}"))
    } else {
        Fault::ConnectionFault {
            reason: format!("failed to read {field}: {err}"),
        }
        .into()
    }
}

/// Reads a single header field, byte by byte. Wrap raw sockets into a `BufReader`.
pub async fn read_field<R: AsyncRead + Unpin>(reader: &mut R, field: &str) -> Result<u64> {
    let mut digits = String::with_capacity(MAX_DIGITS);
    loop {
        let byte = reader.read_u8().await.map_err(|err| io_fault(err, field))?;
        match byte {
            b'\n' => break,
            b'\r' => match reader.read_u8().await.map_err(|err| io_fault(err, field))? {
                b'\n' => break,
                _ => return Err(malformed(format!("stray carriage return in {field}"))),
            },
            b'0'..=b'9' if digits.len() < MAX_DIGITS => digits.push(byte as char),
            b'0'..=b'9' => {
                return Err(malformed(format!("{field} is longer than {MAX_DIGITS} digits")))
            }
            other => {
                return Err(malformed(format!(
                    "unexpected byte {other:#04x} in {field}"
                )))
            }
        }
    }

    if digits.is_empty() {
        return Err(malformed(format!("{field} is empty")));
    }
    digits
        .parse()
        .map_err(|err| malformed(format!("{field} {digits} is out of range: {err}")))
}

/// Reads exactly `size` bytes of the frame body.
async fn read_body<R: AsyncRead + Unpin>(reader: &mut R, size: u64, field: &str) -> Result<Vec<u8>> {
    let size = usize::try_from(size)
        .map_err(|_| malformed(format!("{field} size {size} is out of range")))?;
    let mut body = vec![0; size];
    reader
        .read_exact(&mut body)
        .await
        .map_err(|err| io_fault(err, field))?;
    Ok(body)
}

async fn write_fields<W: AsyncWrite + Unpin>(writer: &mut W, fields: &[u64]) -> Result<()> {
    let header: String = fields.iter().map(|x| format!("{x}\n")).collect();
    writer.write_all(header.as_bytes()).await?;
    Ok(())
}

/// Reads a complete request. Payloads larger than `max_payload` are rejected before being read.
pub async fn read_request<R: AsyncRead + Unpin>(reader: &mut R, max_payload: u64) -> Result<Request> {
    let mode = read_field(reader, "mode").await?;
    let parallelism = read_field(reader, "parallelism").await?;
    let size = read_field(reader, "payload size").await?;
    if size > max_payload {
        // The oversized payload is consumed, so the peer finishes the upload and sees the reply
        if let Err(err) = discard(reader, size).await {
            log::debug!("Failed to discard the oversized payload: {err}");
        }
        return Err(malformed(format!(
            "payload of {size} bytes exceeds the limit of {max_payload} bytes"
        )));
    }
    let payload = read_body(reader, size, "payload").await?;
    Ok(Request {
        mode,
        parallelism,
        payload,
    })
}

/// Reads and drops up to `limit` bytes, stopping early at EOF. Returns the number of dropped bytes.
pub async fn discard<R: AsyncRead + Unpin>(reader: &mut R, limit: u64) -> io::Result<u64> {
    tokio::io::copy(&mut (&mut *reader).take(limit), &mut tokio::io::sink()).await
}

pub async fn write_request<W: AsyncWrite + Unpin>(writer: &mut W, request: &Request) -> Result<()> {
    write_fields(
        writer,
        &[request.mode, request.parallelism, request.payload.len() as u64],
    )
    .await?;
    writer.write_all(&request.payload).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_reply<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Reply> {
    let code = read_field(reader, "status").await?;
    let status =
        Status::from_code(code).ok_or_else(|| malformed(format!("unknown status code {code}")))?;
    let size = read_field(reader, "body size").await?;
    let body = read_body(reader, size, "body").await?;
    Ok(Reply { status, body })
}

/// Writes the reply header only: `size` body bytes must follow.
pub async fn write_reply_header<W: AsyncWrite + Unpin>(
    writer: &mut W,
    status: Status,
    size: u64,
) -> Result<()> {
    write_fields(writer, &[status.code(), size]).await
}

pub async fn write_reply<W: AsyncWrite + Unpin>(writer: &mut W, reply: &Reply) -> Result<()> {
    write_reply_header(writer, reply.status, reply.body.len() as u64).await?;
    writer.write_all(&reply.body).await?;
    writer.flush().await?;
    Ok(())
}
