// Copyright (c) 2025 Sketch Store Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Line-oriented server loop.
//!
//! Reads one request per line until end of input and writes one response
//! line per request. Lines longer than the configured limit are discarded and
//! answered with a `message_too_large` error; blank lines are skipped.

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, instrument, warn};

use super::handler::CommandHandler;
use super::types::Response;
use crate::error::protocol::ProtocolError;
use crate::error::{get_error_reporting, ErrorContext, SketchError, SketchResult};

/// Counters for one run of the server loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    /// Request lines answered
    pub requests: u64,
    /// Responses that carried an error
    pub errors: u64,
}

/// Serve requests from `reader`, writing responses to `writer`, until EOF.
#[instrument(skip_all, fields(max_line_bytes = max_line_bytes))]
pub async fn serve<R, W>(
    handler: &CommandHandler,
    mut reader: R,
    mut writer: W,
    max_line_bytes: usize,
) -> SketchResult<ServeStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stats = ServeStats::default();
    let mut line = Vec::new();
    let limit = u64::try_from(max_line_bytes).unwrap_or(u64::MAX).saturating_add(1);

    loop {
        line.clear();
        let read = (&mut reader)
            .take(limit)
            .read_until(b'\n', &mut line)
            .await
            .map_err(|e| transport_failure(e, "read"))?;
        if read == 0 {
            break;
        }

        let terminated = line.ends_with(b"\n");
        let content_len = line.len() - usize::from(terminated);

        let response = if content_len > max_line_bytes {
            let discarded = if terminated {
                0
            } else {
                discard_line(&mut reader)
                    .await
                    .map_err(|e| transport_failure(e, "read"))?
            };
            let error = ProtocolError::MessageTooLarge {
                size: content_len + discarded,
                max_size: max_line_bytes,
            };
            warn!(error = %error, "Rejected request line");
            Response::error(None, &SketchError::Protocol(error))
        } else {
            match std::str::from_utf8(&line[..content_len]) {
                Ok(text) if text.trim().is_empty() => continue,
                Ok(text) => handler.handle_line(text.trim()),
                Err(e) => {
                    let error = ProtocolError::InvalidRequest(format!("line is not UTF-8: {e}"));
                    warn!(error = %error, "Rejected request line");
                    Response::error(None, &SketchError::Protocol(error))
                }
            }
        };

        stats.requests += 1;
        if response.is_error() {
            stats.errors += 1;
        }
        write_response(&mut writer, &response).await?;
    }

    writer
        .flush()
        .await
        .map_err(|e| transport_failure(e, "flush"))?;
    info!(requests = stats.requests, errors = stats.errors, "Input closed");
    Ok(stats)
}

/// Serve requests on the process's stdin and stdout.
pub async fn serve_stdio(handler: &CommandHandler, max_line_bytes: usize) -> SketchResult<ServeStats> {
    serve(handler, BufReader::new(io::stdin()), io::stdout(), max_line_bytes).await
}

async fn write_response<W>(writer: &mut W, response: &Response) -> SketchResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut encoded = serde_json::to_vec(response)?;
    encoded.push(b'\n');
    writer
        .write_all(&encoded)
        .await
        .map_err(|e| transport_failure(e, "write"))?;
    writer
        .flush()
        .await
        .map_err(|e| transport_failure(e, "flush"))?;
    Ok(())
}

/// Skip the rest of the current line, newline included. Returns the number of
/// bytes skipped before the newline.
async fn discard_line<R>(reader: &mut R) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut discarded = 0;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(discarded);
        }
        match available.iter().position(|byte| *byte == b'\n') {
            Some(newline) => {
                reader.consume(newline + 1);
                return Ok(discarded + newline);
            }
            None => {
                let len = available.len();
                reader.consume(len);
                discarded += len;
            }
        }
    }
}

fn transport_failure(error: std::io::Error, operation: &str) -> SketchError {
    let error = SketchError::Protocol(ProtocolError::Transport(error));
    get_error_reporting().report(
        ErrorContext::new(SketchError::Custom(error.to_string()), "protocol::server")
            .with_details(format!("{operation} failed"))
            .with_span_trace(),
    );
    error
}
