//! SSE streaming adapter
//!
//! Converts a backend-native `text/event-stream` body into a lazily
//! produced, finite, single-pass stream of canonical [`StreamEvent`]s.
//!
//! The adaptation happens in two stages:
//!
//! 1. A background task pumps the response body, reassembles SSE event
//!    blocks across chunk boundaries (events are separated by blank
//!    lines), and forwards each `data:` payload over a channel.
//! 2. The consumer-facing stream parses each payload with a
//!    backend-specific chunk parser, silently skipping unrecognized
//!    shapes, and terminates after the first stop event (or the
//!    `[DONE]` sentinel).
//!
//! Dropping the stream closes the channel; the pump task then stops and
//! releases the underlying connection.

use crate::api::StreamEvent;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// A canonical event stream: lazy, finite, non-restartable
pub type EventStream = Pin<Box<dyn futures::Stream<Item = StreamEvent> + Send>>;

/// Result of parsing one SSE `data:` payload
pub(crate) enum SseChunk {
    /// Zero or more recognized events (empty = skip this chunk)
    Events(Vec<StreamEvent>),
    /// Terminal sentinel; the stream ends without further events
    Done,
}

/// Backend-specific chunk parser
pub(crate) type ChunkParser = fn(&str) -> SseChunk;

/// Adapt an SSE response body into a canonical event stream
///
/// # Arguments
///
/// * `response` - The streaming HTTP response (status already checked)
/// * `parse` - Chunk parser for the backend's delta schema
pub(crate) fn event_stream(response: reqwest::Response, parse: ChunkParser) -> EventStream {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(pump_sse_body(response.bytes_stream(), tx));

    let frames = UnboundedReceiverStream::new(rx);
    Box::pin(futures::stream::unfold(
        (frames, VecDeque::new(), false),
        move |(mut frames, mut pending, done)| async move {
            if done {
                return None;
            }
            loop {
                if let Some(event) = pending.pop_front() {
                    let finished = matches!(event, StreamEvent::Stop { .. });
                    return Some((event, (frames, pending, finished)));
                }
                match frames.next().await {
                    None => return None,
                    Some(frame) => match parse(&frame) {
                        SseChunk::Done => return None,
                        SseChunk::Events(events) => pending.extend(events),
                    },
                }
            }
        },
    ))
}

/// Pump the response body, reassembling SSE events across chunk boundaries
///
/// SSE events are separated by blank lines (`\n\n`); a single event may
/// span several body chunks and a single chunk may carry several events.
/// Stops when the body ends or the receiver is dropped.
async fn pump_sse_body(
    body: impl Stream<Item = reqwest::Result<Bytes>>,
    tx: mpsc::UnboundedSender<String>,
) {
    let mut buffer = String::new();

    tokio::pin!(body);

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(error) => {
                tracing::debug!("stream body ended with error: {}", error);
                break;
            }
        };

        let text = match std::str::from_utf8(&chunk) {
            Ok(text) => text,
            Err(_) => continue,
        };
        buffer.push_str(text);

        while let Some(pos) = buffer.find("\n\n") {
            let block = buffer[..pos].to_string();
            buffer = buffer[pos + 2..].to_string();
            if forward_data_lines(&block, &tx).is_err() {
                // Receiver dropped: the consumer stopped reading.
                return;
            }
        }
    }

    if !buffer.is_empty() {
        let _ = forward_data_lines(&buffer, &tx);
    }
}

/// Forward the joined `data:` payload of one SSE event block
///
/// Blocks without a `data:` field (comments, bare `event:`/`id:` lines)
/// are ignored.
fn forward_data_lines(
    block: &str,
    tx: &mpsc::UnboundedSender<String>,
) -> Result<(), mpsc::error::SendError<String>> {
    let mut data_lines: Vec<&str> = Vec::new();
    for line in block.lines() {
        if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.trim());
        }
    }
    if data_lines.is_empty() {
        return Ok(());
    }
    tx.send(data_lines.join("\n"))
}
