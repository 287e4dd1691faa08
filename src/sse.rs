//! Server-Sent Events (SSE) processing for streaming completions.
//!
//! This module turns the raw byte stream of a `chat/completions` response into
//! a stream of [`StreamUpdate`]s.  Events are separated by a blank line, each
//! carries one or more `data:` lines, and the stream ends with `data: [DONE]`.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_EVENTS};
use crate::types::{ChatCompletionChunk, StreamUpdate};
use crate::{Error, Result};

/// What one complete SSE event decoded to.
enum Decoded {
    Update(Result<StreamUpdate>),
    Skip,
    Done,
}

/// Process a stream of bytes into a stream of stream updates.
///
/// Bytes are buffered until a complete event is available, so neither events
/// nor multi-byte characters need to align with network chunks.
///
/// # Examples
///
/// ```
/// # tokio_test::block_on(async {
/// use bytes::Bytes;
/// use futures::{StreamExt, stream};
/// use modelchat::sse::process_sse;
///
/// let body = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(
///     b"data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n\n",
/// ))]);
/// let updates: Vec<_> = process_sse(body).collect().await;
/// assert_eq!(updates.len(), 1);
/// assert_eq!(updates[0].as_ref().unwrap().fragment.as_deref(), Some("Hi"));
/// # });
/// ```
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<StreamUpdate>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let buffer: Vec<u8> = Vec::new();

    stream::unfold(
        (stream, buffer, false),
        move |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }
            loop {
                // Drain every complete event already buffered.
                while let Some(event) = take_event(&mut buffer) {
                    match decode_event(&event) {
                        Decoded::Update(update) => {
                            if update.is_err() {
                                STREAM_ERRORS.click();
                            }
                            return Some((update, (stream, buffer, false)));
                        }
                        Decoded::Skip => continue,
                        Decoded::Done => return None,
                    }
                }

                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        buffer.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(e), (stream, buffer, true)));
                    }
                    None => {
                        // A final event without its trailing blank line.
                        if buffer.iter().any(|b| !b.is_ascii_whitespace()) {
                            let event = std::mem::take(&mut buffer);
                            if let Decoded::Update(update) = decode_event(&event) {
                                return Some((update, (stream, buffer, true)));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Split the first complete event off the front of `buffer`.
fn take_event(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let (end, separator_len) = find_event_boundary(buffer)?;
    let event = buffer[..end].to_vec();
    buffer.drain(..end + separator_len);
    Some(event)
}

fn find_event_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Decode one SSE event into an update.
fn decode_event(event: &[u8]) -> Decoded {
    let text = match std::str::from_utf8(event) {
        Ok(text) => text,
        Err(e) => {
            return Decoded::Update(Err(Error::encoding(
                format!("Invalid UTF-8 in stream: {e}"),
                Some(Box::new(e)),
            )));
        }
    };

    let mut data: Option<String> = None;
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.starts_with(':') {
            continue;
        }
        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            match data.as_mut() {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(value);
                }
                None => data = Some(value.to_string()),
            }
        }
    }

    let Some(data) = data else {
        return Decoded::Skip;
    };
    let data = data.trim();
    if data.is_empty() {
        return Decoded::Skip;
    }
    if data == "[DONE]" {
        return Decoded::Done;
    }

    STREAM_EVENTS.click();
    Decoded::Update(parse_chunk(data))
}

fn parse_chunk(data: &str) -> Result<StreamUpdate> {
    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: ErrorDetail,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        code: Option<serde_json::Value>,
        message: Option<String>,
    }

    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(data) {
        let code = envelope.error.code.map(|code| match code {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        let message = envelope
            .error
            .message
            .unwrap_or_else(|| "error event in stream".to_string());
        return Err(Error::api(500, code, message, None));
    }

    serde_json::from_str::<ChatCompletionChunk>(data)
        .map(StreamUpdate::from)
        .map_err(|e| {
            Error::serialization(
                format!("Failed to parse event JSON: {e}"),
                Some(Box::new(e)),
            )
        })
}
