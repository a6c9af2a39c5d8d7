//! Decoding of streamed completions.
//!
//! A streamed completion is a sequence of newline-delimited lines.  Lines that begin with
//! `data: ` carry a JSON [`StreamChunk`]; every other line, blank ones included, carries
//! nothing.  This module turns the HTTP byte stream into a stream of text fragments, skipping
//! lines that fail to decode and stopping early when a [`CancellationToken`] fires.

use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::observability::{STREAM_BYTES, STREAM_CANCELLATIONS, STREAM_CHUNKS, STREAM_PARSE_ERRORS};
use crate::{Error, Result, StreamChunk};

/// Prefix of lines that carry a payload.
pub const DATA_PREFIX: &str = "data: ";

/// A cancellable, lazily decoded sequence of text fragments.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Decode a single line.
///
/// Returns `None` for lines that carry no payload and `Some(Err(Error::Parse))` for payload
/// lines whose JSON does not decode.
pub fn parse_line(line: &str) -> Option<Result<StreamChunk>> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() {
        return None;
    }
    let payload = line.strip_prefix(DATA_PREFIX)?;
    Some(
        serde_json::from_str::<StreamChunk>(payload)
            .map_err(|e| Error::parse(format!("invalid chunk JSON: {e}"), line)),
    )
}

struct LineState<S> {
    stream: S,
    buffer: Vec<u8>,
    cancel: CancellationToken,
    done: bool,
}

/// Process a stream of bytes into a stream of text fragments.
///
/// Fragments are yielded in arrival order.  Malformed lines are logged and skipped.  A
/// transport error is yielded once and ends the stream.  Cancellation is checked before each
/// line and each read; an in-flight read is allowed to finish.
pub fn process_lines<S>(byte_stream: S, cancel: CancellationToken) -> CompletionStream
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + Send + 'static,
{
    let state = LineState {
        stream: byte_stream,
        buffer: Vec::new(),
        cancel,
        done: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if state.done {
                return None;
            }
            if state.cancel.is_cancelled() {
                STREAM_CANCELLATIONS.click();
                tracing::debug!("completion stream cancelled");
                state.done = true;
                return None;
            }

            // First drain complete lines already in the buffer
            if let Some(pos) = state.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = state.buffer.drain(..=pos).collect();
                if let Some(text) = decode_line(&line[..pos]) {
                    return Some((Ok(text), state));
                }
                continue;
            }

            // Read more data
            match state.stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    state.buffer.extend_from_slice(&bytes);
                }
                Some(Err(e)) => {
                    state.done = true;
                    let err = Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e)));
                    return Some((Err(err), state));
                }
                None => {
                    // End of stream; the last line may lack its newline
                    state.done = true;
                    if state.buffer.is_empty() {
                        return None;
                    }
                    let line = std::mem::take(&mut state.buffer);
                    return decode_line(&line).map(|text| (Ok(text), state));
                }
            }
        }
    }))
}

fn decode_line(raw: &[u8]) -> Option<String> {
    let line = match std::str::from_utf8(raw).map_err(Error::from) {
        Ok(line) => line,
        Err(e) => {
            STREAM_PARSE_ERRORS.click();
            tracing::warn!(error = %e, "skipping stream line with invalid UTF-8");
            return None;
        }
    };
    match parse_line(line)? {
        Ok(chunk) => {
            STREAM_CHUNKS.click();
            Some(chunk.result)
        }
        Err(e) => {
            STREAM_PARSE_ERRORS.click();
            tracing::warn!(error = %e, "skipping malformed stream line");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes_stream(
        chunks: Vec<Bytes>,
    ) -> impl Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + Send + 'static
    {
        stream::iter(chunks.into_iter().map(Ok))
    }

    async fn collect(chunks: Vec<Bytes>) -> Vec<String> {
        process_lines(bytes_stream(chunks), CancellationToken::new())
            .map(|r| r.unwrap())
            .collect()
            .await
    }

    #[test]
    fn parse_data_line() {
        let chunk = parse_line(r#"data: {"result":"Hi"}"#).unwrap().unwrap();
        assert_eq!(chunk.result, "Hi");
    }

    #[test]
    fn blank_and_foreign_lines_carry_nothing() {
        assert!(parse_line("").is_none());
        assert!(parse_line("   ").is_none());
        assert!(parse_line("\r").is_none());
        assert!(parse_line("event: ping").is_none());
    }

    #[test]
    fn malformed_line_is_parse_error() {
        let err = parse_line("data: not-json").unwrap().unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn missing_result_is_empty() {
        let chunk = parse_line(r#"data: {"is_end":true}"#).unwrap().unwrap();
        assert_eq!(chunk.result, "");
    }

    #[tokio::test]
    async fn fragments_in_order_skipping_blank_lines() {
        let body = Bytes::from_static(b"data: {\"result\":\"Hi\"}\n\ndata: {\"result\":\" there\"}\n");
        let fragments = collect(vec![body]).await;
        assert_eq!(fragments, vec!["Hi", " there"]);
    }

    #[tokio::test]
    async fn malformed_line_does_not_abort() {
        let fragments = collect(vec![
            Bytes::from_static(b"data: {\"result\":\"a\"}\n"),
            Bytes::from_static(b"data: not-json\n"),
            Bytes::from_static(b"data: {\"result\":\"b\"}\n"),
        ])
        .await;
        assert_eq!(fragments, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn handle_split_line() {
        let fragments = collect(vec![
            Bytes::from_static(b"data: {\"res"),
            Bytes::from_static(b"ult\":\"joined\"}\n"),
        ])
        .await;
        assert_eq!(fragments, vec!["joined"]);
    }

    #[tokio::test]
    async fn handle_split_utf8() {
        // "你" is e4 bd a0
        let fragments = collect(vec![
            Bytes::from_static(b"data: {\"result\":\"\xe4\xbd"),
            Bytes::from_static(b"\xa0\"}\n"),
        ])
        .await;
        assert_eq!(fragments, vec!["你"]);
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_skipped() {
        let fragments = collect(vec![
            Bytes::from_static(b"data: {\"result\":\"\xff\"}\n"),
            Bytes::from_static(b"data: {\"result\":\"ok\"}\n"),
        ])
        .await;
        assert_eq!(fragments, vec!["ok"]);
    }

    #[tokio::test]
    async fn final_line_without_newline() {
        let body = Bytes::from_static(b"data: {\"result\":\"a\"}\r\ndata: {\"result\":\"b\"}");
        let fragments = collect(vec![body]).await;
        assert_eq!(fragments, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn cancelled_before_start_yields_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let body = Bytes::from_static(b"data: {\"result\":\"a\"}\n");
        let fragments: Vec<_> = process_lines(bytes_stream(vec![body]), cancel)
            .collect()
            .await;
        assert!(fragments.is_empty());
    }

    #[tokio::test]
    async fn cancel_stops_buffered_lines() {
        let cancel = CancellationToken::new();
        let body = Bytes::from_static(b"data: {\"result\":\"a\"}\ndata: {\"result\":\"b\"}\n");
        let mut stream = process_lines(bytes_stream(vec![body]), cancel.clone());
        assert_eq!(stream.next().await.unwrap().unwrap(), "a");
        cancel.cancel();
        assert!(stream.next().await.is_none());
    }
}
