//! Incremental Server-Sent-Events decoding.
//!
//! Only `data:` lines are meaningful. Each carries one JSON payload, except
//! the literal `[DONE]` sentinel which ends the stream. Bytes are buffered
//! until a full line is available, so payloads split across reads (including
//! split UTF-8 sequences) decode intact.

use std::fmt::Display;
use std::marker::PhantomData;

use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;

use crate::error::{ProtocolError, Result};

/// End-of-stream sentinel payload.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One decoded SSE payload.
#[derive(Debug, Clone, PartialEq)]
pub enum SseFrame<T> {
    Event(T),
    /// The `[DONE]` sentinel.
    Done,
}

/// Line-buffering decoder for a stream of JSON `data:` payloads.
#[derive(Debug)]
pub struct SseDecoder<T> {
    buffer: Vec<u8>,
    done: bool,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Default for SseDecoder<T> {
    fn default() -> Self {
        Self {
            buffer: Vec::new(),
            done: false,
            _payload: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> SseDecoder<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the `[DONE]` sentinel has been seen.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.done
    }

    /// Feed a chunk of bytes and return every frame it completes.
    ///
    /// After `[DONE]` all further input is discarded.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame<T>> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(frame) = self.decode_line(&line[..pos]) {
                let done = matches!(frame, SseFrame::Done);
                frames.push(frame);
                if done {
                    break;
                }
            }
        }
        frames
    }

    /// Decode whatever is left once the byte stream has ended.
    pub fn finish(&mut self) -> Option<SseFrame<T>> {
        if self.done || self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        self.decode_line(&line)
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<SseFrame<T>> {
        let line = String::from_utf8_lossy(line);
        let line = line.strip_suffix('\r').unwrap_or(&line);

        let data = line.strip_prefix("data:")?;
        let data = data.strip_prefix(' ').unwrap_or(data);

        if data.trim() == DONE_SENTINEL {
            self.done = true;
            self.buffer.clear();
            return Some(SseFrame::Done);
        }

        match parse_payload(data) {
            Ok(event) => Some(SseFrame::Event(event)),
            Err(e) => {
                tracing::warn!(data = %data, error = %e, "skipping malformed SSE payload");
                None
            }
        }
    }
}

fn parse_payload<T: DeserializeOwned>(data: &str) -> Result<T> {
    Ok(serde_json::from_str(data)?)
}

/// Decode a byte stream into SSE frames.
///
/// The returned stream ends right after `[DONE]` without polling `bytes`
/// again, or at the first transport error.
pub fn decode_stream<T, S, B, E>(bytes: S) -> impl Stream<Item = Result<SseFrame<T>>>
where
    T: DeserializeOwned,
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    async_stream::stream! {
        let mut decoder = SseDecoder::<T>::new();
        futures::pin_mut!(bytes);

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(ProtocolError::Transport(e.to_string()));
                    return;
                }
            };

            for frame in decoder.push(chunk.as_ref()) {
                yield Ok(frame);
            }
            if decoder.is_done() {
                return;
            }
        }

        if let Some(frame) = decoder.finish() {
            yield Ok(frame);
        }
    }
}
