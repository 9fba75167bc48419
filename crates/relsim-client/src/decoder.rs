use std::collections::VecDeque;
use std::pin::Pin;

use futures::StreamExt as _;
use futures::stream;
use tracing::{debug, warn};

use crate::errors::{ClientError, FrameError};
use crate::stream::StreamEvent;

const DATA_PREFIX: &str = "data: ";

/// Raw response body chunks as produced by `reqwest::Response::bytes_stream`.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, ClientError>> + Send + 'static>>;

/// Lazy, finite sequence of decoded events; ends on end-of-input or the
/// first transport error.
pub type EventStream =
    Pin<Box<dyn futures::Stream<Item = Result<StreamEvent, ClientError>> + Send + 'static>>;

/// Incremental decoder for newline-delimited `data: <json>` frames.
///
/// Bytes after the last `\n` are kept and prefixed to the next chunk, so a
/// frame may be split anywhere (including inside a multi-byte character).
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buf: Vec<u8>,
    /// `buf[..scanned]` is known to hold no `\n`.
    scanned: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every frame completed by it, in order.
    ///
    /// Only the newly appended bytes are searched for line ends.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<Result<StreamEvent, FrameError>> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();
        let mut line_start = 0;
        let mut cursor = self.scanned;
        while let Some(offset) = self.buf[cursor..].iter().position(|b| *b == b'\n') {
            let end = cursor + offset;
            if let Some(result) = parse_line(&self.buf[line_start..end]) {
                out.push(result);
            }
            line_start = end + 1;
            cursor = line_start;
        }
        self.buf.drain(..line_start);
        self.scanned = self.buf.len();
        out
    }

    /// Bytes of the current unterminated line.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }
}

fn parse_line(bytes: &[u8]) -> Option<Result<StreamEvent, FrameError>> {
    let text = String::from_utf8_lossy(bytes);
    let line = text.strip_suffix('\r').unwrap_or(&text);
    let payload = line.strip_prefix(DATA_PREFIX)?;
    Some(
        serde_json::from_str::<StreamEvent>(payload)
            .map_err(|e| FrameError::invalid_json(payload, e.to_string())),
    )
}

/// Wraps a byte stream into an event stream.
///
/// Malformed frames are logged and skipped. A transport error ends the
/// stream with that error as the last item.
pub fn decode_event_stream(bytes_stream: ByteStream) -> EventStream {
    struct State {
        bytes_stream: ByteStream,
        decoder: StreamDecoder,
        pending: VecDeque<StreamEvent>,
        done: bool,
    }

    let stream = stream::try_unfold(
        State {
            bytes_stream,
            decoder: StreamDecoder::new(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Ok(Some((event, state)));
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        for frame in state.decoder.push_chunk(&chunk) {
                            match frame {
                                Ok(event) => state.pending.push_back(event),
                                Err(err) => {
                                    warn!(frame = %err.line(), error = %err, "skipping malformed stream frame")
                                }
                            }
                        }
                    }
                    Some(Err(e)) => return Err(e),
                    None => {
                        let leftover = state.decoder.pending().len();
                        if leftover > 0 {
                            debug!(bytes = leftover, "discarding unterminated trailing stream data");
                        }
                        state.done = true;
                    }
                }
            }
        },
    );
    Box::pin(stream)
}
