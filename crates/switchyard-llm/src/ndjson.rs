//! Newline-delimited JSON decoding over a byte stream

use std::fmt::Display;

use bytes::{Bytes, BytesMut};
use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;

use crate::error::LlmError;

struct DecodeState<E> {
    stream: BoxStream<'static, Result<Bytes, E>>,
    buf: BytesMut,
    done: bool,
}

/// Decode one `T` per line of `byte_stream`
///
/// Lines that do not parse are skipped. A trailing line without a newline
/// is decoded when the stream ends. A transport error is yielded once and
/// ends the stream.
pub fn decode<S, E, T>(byte_stream: S) -> impl Stream<Item = Result<T, LlmError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
    T: DeserializeOwned + Send + 'static,
{
    let state = DecodeState {
        stream: byte_stream.boxed(),
        buf: BytesMut::new(),
        done: false,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }

        loop {
            if let Some(line_end) = st.buf.iter().position(|b| *b == b'\n') {
                let line = st.buf.split_to(line_end + 1);
                if let Some(item) = parse_line(&line) {
                    return Some((Ok(item), st));
                }
                continue;
            }

            match st.stream.next().await {
                Some(Ok(chunk)) => st.buf.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "backend stream failed");
                    st.done = true;
                    return Some((Err(LlmError::Streaming(format!("backend stream failed: {e}"))), st));
                }
                None => {
                    st.done = true;
                    let rest = st.buf.split();
                    return parse_line(&rest).map(|item| (Ok(item), st));
                }
            }
        }
    })
}

fn parse_line<T: DeserializeOwned>(line: &[u8]) -> Option<T> {
    let text = String::from_utf8_lossy(line);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str(trimmed) {
        Ok(item) => Some(item),
        Err(e) => {
            tracing::debug!(error = %e, line = %trimmed, "skipping unparseable NDJSON line");
            None
        }
    }
}
