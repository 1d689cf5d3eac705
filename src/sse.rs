//! Server-sent-event decoding for streaming completions.
//!
//! This module turns the raw byte stream of a streaming `/chat/completions`
//! response into a stream of incremental text fragments followed by a
//! completion signal. The framing contract is explicit:
//!
//! - events are newline-delimited; blank lines separate events and are
//!   ignored;
//! - a `data:` line carries a JSON chunk; a chunk that fails to parse is
//!   skipped, never fatal;
//! - the literal payload `[DONE]` is the terminal sentinel: decoding stops
//!   and nothing is emitted afterward;
//! - if the transport ends without the sentinel, the stream simply ends and
//!   callers treat that as completion.
//!
//! Framing is byte-oriented: a line is only decoded once its trailing
//! newline has arrived, so a multi-byte UTF-8 sequence split across chunk
//! boundaries stays buffered until the fragment is codepoint-complete.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_EVENTS, STREAM_SKIPPED_LINES};
use crate::types::ChatChunk;
use crate::{Error, Result};

/// Prefix marking a data line in the event stream.
const DATA_PREFIX: &str = "data:";

/// Terminal sentinel payload marking the end of the stream.
const DONE_SENTINEL: &str = "[DONE]";

/// An event decoded from the completion stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// An incremental text fragment.
    Delta(String),

    /// The terminal sentinel was observed; no further events follow.
    Done,
}

/// Decode a stream of bytes into a stream of completion events.
///
/// Fragments are yielded as soon as their line completes, so the caller can
/// render each one before the next arrives. After `Done` the underlying
/// transport is no longer consumed.
pub fn decode_sse<S>(byte_stream: S) -> impl Stream<Item = Result<StreamEvent>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + 'static,
{
    // Convert reqwest errors to our error type
    let stream = byte_stream.map(|result| {
        result.map_err(|e| {
            Error::transport(format!("error in HTTP stream: {e}"), None, Some(Box::new(e)))
        })
    });

    let state = DecoderState {
        buffer: Vec::new(),
        done: false,
    };

    stream::unfold((stream, state), move |(mut stream, mut state)| async move {
        if state.done {
            return None;
        }
        loop {
            // Drain complete lines already in the buffer.
            while let Some(line) = extract_line(&mut state.buffer) {
                match parse_line(&line) {
                    LineOutcome::Fragment(text) => {
                        STREAM_EVENTS.click();
                        return Some((Ok(StreamEvent::Delta(text)), (stream, state)));
                    }
                    LineOutcome::Done => {
                        state.done = true;
                        return Some((Ok(StreamEvent::Done), (stream, state)));
                    }
                    LineOutcome::Skip => continue,
                }
            }

            // Read more data
            match stream.next().await {
                Some(Ok(bytes)) => {
                    state.buffer.extend_from_slice(&bytes);
                }
                Some(Err(e)) => {
                    return Some((Err(e), (stream, state)));
                }
                None => {
                    // Transport ended without the sentinel. A trailing line
                    // without a newline is still a complete event.
                    if !state.buffer.is_empty() {
                        let line = std::mem::take(&mut state.buffer);
                        match parse_line(&line) {
                            LineOutcome::Fragment(text) => {
                                STREAM_EVENTS.click();
                                state.done = true;
                                return Some((Ok(StreamEvent::Delta(text)), (stream, state)));
                            }
                            LineOutcome::Done => {
                                state.done = true;
                                return Some((Ok(StreamEvent::Done), (stream, state)));
                            }
                            LineOutcome::Skip => {}
                        }
                    }
                    return None;
                }
            }
        }
    })
}

struct DecoderState {
    buffer: Vec<u8>,
    done: bool,
}

/// The classification of a single framed line.
enum LineOutcome {
    Fragment(String),
    Done,
    Skip,
}

/// Remove and return the next complete line from the buffer.
///
/// A line is complete once its `\n` has arrived. Splitting at the newline
/// byte is UTF-8 safe: continuation bytes never equal `0x0A`, so a partial
/// multi-byte sequence can only sit at the end of the buffer, past every
/// complete line.
fn extract_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let pos = buffer.iter().position(|&b| b == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=pos).collect();
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(line)
}

/// Classify a framed line as a fragment, the sentinel, or noise.
///
/// Blank lines, non-data lines, invalid UTF-8, unparseable JSON, and chunks
/// without content all fall into `Skip`.
fn parse_line(line: &[u8]) -> LineOutcome {
    let Ok(text) = std::str::from_utf8(line) else {
        STREAM_SKIPPED_LINES.click();
        return LineOutcome::Skip;
    };
    let text = text.trim();
    if text.is_empty() {
        return LineOutcome::Skip;
    }
    let Some(payload) = text.strip_prefix(DATA_PREFIX).map(str::trim) else {
        STREAM_SKIPPED_LINES.click();
        return LineOutcome::Skip;
    };
    if payload == DONE_SENTINEL {
        return LineOutcome::Done;
    }
    match serde_json::from_str::<ChatChunk>(payload) {
        Ok(chunk) => match chunk.fragment() {
            Some(fragment) => LineOutcome::Fragment(fragment.to_string()),
            None => LineOutcome::Skip,
        },
        Err(_) => {
            // Malformed chunks must never abort the stream.
            STREAM_SKIPPED_LINES.click();
            LineOutcome::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    async fn decode_all(chunks: Vec<&'static [u8]>) -> Vec<StreamEvent> {
        let stream = Box::pin(stream::iter(
            chunks.into_iter().map(|c| Ok(Bytes::from(c))),
        ));
        let sse_stream = Box::pin(decode_sse(stream));
        sse_stream
            .map(|event| event.expect("decoder should not surface errors here"))
            .collect()
            .await
    }

    #[tokio::test]
    async fn single_fragment_then_done() {
        let data: &[u8] = b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n\n";
        let events = decode_all(vec![data]).await;
        assert_eq!(
            events,
            vec![StreamEvent::Delta("Hi".to_string()), StreamEvent::Done]
        );
    }

    #[tokio::test]
    async fn nothing_after_done() {
        let data: &[u8] =
            b"data: [DONE]\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n";
        let events = decode_all(vec![data]).await;
        assert_eq!(events, vec![StreamEvent::Done]);
    }

    #[tokio::test]
    async fn malformed_line_does_not_abort() {
        let data: &[u8] = b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\ndata: not-json\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\ndata: [DONE]\n\n";
        let events = decode_all(vec![data]).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Delta("a".to_string()),
                StreamEvent::Delta("b".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn chunk_without_choices_yields_no_fragment() {
        let data: &[u8] = b"data: {}\n\ndata: {\"choices\":[]}\n\ndata: [DONE]\n\n";
        let events = decode_all(vec![data]).await;
        assert_eq!(events, vec![StreamEvent::Done]);
    }

    #[tokio::test]
    async fn event_split_across_chunks() {
        let chunk1: &[u8] = b"data: {\"choices\":[{\"del";
        let chunk2: &[u8] = b"ta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n\n";
        let events = decode_all(vec![chunk1, chunk2]).await;
        assert_eq!(
            events,
            vec![StreamEvent::Delta("Hi".to_string()), StreamEvent::Done]
        );
    }

    #[tokio::test]
    async fn utf8_sequence_split_across_chunks() {
        // "héllo" with the two-byte é split between transport chunks.
        let chunk1: &[u8] = b"data: {\"choices\":[{\"delta\":{\"content\":\"h\xc3";
        let chunk2: &[u8] = b"\xa9llo\"}}]}\n\ndata: [DONE]\n\n";
        let events = decode_all(vec![chunk1, chunk2]).await;
        assert_eq!(
            events,
            vec![StreamEvent::Delta("héllo".to_string()), StreamEvent::Done]
        );
    }

    #[tokio::test]
    async fn transport_end_without_sentinel_is_completion() {
        let data: &[u8] = b"data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}\n\n";
        let events = decode_all(vec![data]).await;
        assert_eq!(events, vec![StreamEvent::Delta("tail".to_string())]);
    }

    #[tokio::test]
    async fn trailing_line_without_newline_still_decodes() {
        let data: &[u8] = b"data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}";
        let events = decode_all(vec![data]).await;
        assert_eq!(events, vec![StreamEvent::Delta("tail".to_string())]);
    }

    #[tokio::test]
    async fn crlf_lines_are_framed() {
        let data: &[u8] =
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\r\n\r\ndata: [DONE]\r\n\r\n";
        let events = decode_all(vec![data]).await;
        assert_eq!(
            events,
            vec![StreamEvent::Delta("Hi".to_string()), StreamEvent::Done]
        );
    }

    #[tokio::test]
    async fn empty_content_yields_no_fragment() {
        let data: &[u8] =
            b"data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n\ndata: [DONE]\n\n";
        let events = decode_all(vec![data]).await;
        assert_eq!(events, vec![StreamEvent::Done]);
    }
}
