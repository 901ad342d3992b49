//! Incremental newline-delimited JSON decoding for streamed responses.
//!
//! Ollama streams one JSON object per line, but network chunks do not respect
//! line boundaries: a chunk may carry half a line or several lines.
//! [`LineBuffer`] reassembles complete lines; [`ndjson_stream`] turns a
//! response body into a stream of decoded values in arrival order.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::{stream, Stream, StreamExt};
use serde::de::DeserializeOwned;

use super::GatewayError;

/// Accumulates bytes and yields complete, non-blank lines.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    /// Feed a chunk and return every line it completed.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if !line.iter().all(u8::is_ascii_whitespace) {
                lines.push(line);
            }
        }
        lines
    }

    /// Return the trailing unterminated line, if any, when the body ends.
    pub(crate) fn finish(self) -> Option<Vec<u8>> {
        if self.buffer.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(self.buffer)
        }
    }
}

/// Decodes a streamed response body as newline-delimited JSON.
///
/// The stream ends after the body ends or after the first transport error.
pub(crate) fn ndjson_stream<T>(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<T, GatewayError>> + Send>>
where
    T: DeserializeOwned + Send + 'static,
{
    let body = response.bytes_stream().boxed();
    let state = (body, Some(LineBuffer::default()), VecDeque::<Vec<u8>>::new());

    stream::unfold(state, |(mut body, mut buffer, mut ready)| async move {
        loop {
            if let Some(line) = ready.pop_front() {
                let decoded = serde_json::from_slice::<T>(&line).map_err(GatewayError::from);
                return Some((decoded, (body, buffer, ready)));
            }
            if buffer.is_none() {
                return None;
            }
            match body.next().await {
                Some(Ok(chunk)) => {
                    if let Some(lines) = buffer.as_mut() {
                        ready.extend(lines.push(&chunk));
                    }
                }
                Some(Err(err)) => return Some((Err(err.into()), (body, None, ready))),
                None => {
                    if let Some(rest) = buffer.take().and_then(LineBuffer::finish) {
                        ready.push_back(rest);
                    }
                }
            }
        }
    })
    .boxed()
}
