//! Relay pipeline for OpenAI Server-Sent Events
//!
//! The upstream body is decoded and split into SSE events by
//! `eventsource-stream`. Each event's `data` goes through a
//! [`FragmentFilter`], which decides whether the content fragment is
//! emitted, skipped, or ends the stream. Only the current partial frame is
//! ever buffered.

use super::types::StreamChunk;
use crate::error::RelayError;
use bytes::Bytes;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::time::Duration;
use tracing::{debug, warn};

/// Data payload that terminates the upstream stream
pub const DONE_MARKER: &str = "[DONE]";

/// Number of emitted fragments during which newline-bearing fragments are
/// dropped
pub const STARTUP_FILTER_FRAGMENTS: usize = 2;

/// What to do with one SSE data frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Forward this fragment to the client
    Emit(String),
    /// Drop the frame and keep going
    Skip(SkipReason),
    /// Termination marker seen; close the output
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Data was not a JSON stream chunk
    Malformed,
    /// Chunk carried no content (role announcements, finish frames)
    Empty,
    /// Newline-bearing fragment before the startup window closed
    LeadingNewline,
}

/// Per-request frame state.
///
/// The emitted-fragment counter starts at zero for every relay invocation
/// and only advances when a fragment is actually emitted.
#[derive(Debug, Default)]
pub struct FragmentFilter {
    emitted: usize,
    done: bool,
}

impl FragmentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fragments emitted so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Classify one SSE `data` payload. Once `Done` has been returned every
    /// later call returns `Done` as well.
    pub fn process(&mut self, data: &str) -> FrameOutcome {
        if self.done {
            return FrameOutcome::Done;
        }
        if data == DONE_MARKER {
            self.done = true;
            return FrameOutcome::Done;
        }

        let chunk: StreamChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                debug!("Skipping malformed stream chunk: {}", e);
                return FrameOutcome::Skip(SkipReason::Malformed);
            }
        };

        let content = chunk.content();
        if content.is_empty() {
            return FrameOutcome::Skip(SkipReason::Empty);
        }
        if self.emitted < STARTUP_FILTER_FRAGMENTS && content.contains('\n') {
            return FrameOutcome::Skip(SkipReason::LeadingNewline);
        }

        self.emitted += 1;
        FrameOutcome::Emit(content.to_string())
    }
}

/// Turn an upstream SSE body into the relay's plain-text byte stream.
///
/// The stream ends after the termination marker, when the body is
/// exhausted, or with an error when the body fails, is not valid UTF-8, or
/// stays silent for longer than `idle_timeout`.
pub fn relay_stream<S, B, E>(
    body: S,
    idle_timeout: Duration,
) -> impl Stream<Item = Result<Bytes, RelayError>> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    async_stream::stream! {
        let mut filter = FragmentFilter::new();
        let mut events = Box::pin(body.eventsource());

        loop {
            let next = match tokio::time::timeout(idle_timeout, events.next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!("No upstream data for {:?}, closing relay stream", idle_timeout);
                    yield Err(RelayError::Timeout { secs: idle_timeout.as_secs() });
                    break;
                }
            };

            let event = match next {
                Some(Ok(event)) => event,
                Some(Err(e)) => {
                    warn!("Upstream stream failed: {}", e);
                    yield Err(map_event_error(e));
                    break;
                }
                None => {
                    debug!("Upstream body exhausted after {} fragments", filter.emitted());
                    break;
                }
            };

            match filter.process(&event.data) {
                FrameOutcome::Emit(fragment) => yield Ok(Bytes::from(fragment)),
                FrameOutcome::Skip(reason) => debug!(?reason, "Skipped stream frame"),
                FrameOutcome::Done => {
                    debug!("Termination marker after {} fragments", filter.emitted());
                    break;
                }
            }
        }
    }
}

fn map_event_error<E: Display>(err: EventStreamError<E>) -> RelayError {
    match err {
        EventStreamError::Utf8(e) => RelayError::Decode(e.to_string()),
        EventStreamError::Transport(e) => RelayError::Stream(e.to_string()),
        other => RelayError::Stream(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::convert::Infallible;

    fn frame(content: &str) -> String {
        serde_json::json!({ "choices": [{ "delta": { "content": content } }] }).to_string()
    }

    async fn collect(chunks: Vec<Vec<u8>>) -> Result<String, RelayError> {
        let body = stream::iter(chunks.into_iter().map(|c| Ok::<_, Infallible>(Bytes::from(c))));
        let parts: Vec<Result<Bytes, RelayError>> =
            relay_stream(body, Duration::from_secs(5)).collect().await;

        let mut out = Vec::new();
        for part in parts {
            out.extend_from_slice(&part?);
        }
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_filter_done_is_sticky() {
        let mut filter = FragmentFilter::new();
        assert_eq!(filter.process(DONE_MARKER), FrameOutcome::Done);
        assert!(filter.is_done());
        assert_eq!(filter.process(&frame("late")), FrameOutcome::Done);
    }

    #[test]
    fn test_filter_malformed_is_skipped() {
        let mut filter = FragmentFilter::new();
        assert_eq!(
            filter.process("not-json"),
            FrameOutcome::Skip(SkipReason::Malformed)
        );
        assert_eq!(filter.process(&frame("ok")), FrameOutcome::Emit("ok".into()));
    }

    #[test]
    fn test_filter_leading_newlines_do_not_count() {
        let mut filter = FragmentFilter::new();
        assert_eq!(
            filter.process(&frame("\n")),
            FrameOutcome::Skip(SkipReason::LeadingNewline)
        );
        assert_eq!(
            filter.process(&frame("\n\n")),
            FrameOutcome::Skip(SkipReason::LeadingNewline)
        );
        assert_eq!(filter.emitted(), 0);

        assert_eq!(filter.process(&frame("A")), FrameOutcome::Emit("A".into()));
        assert_eq!(
            filter.process(&frame("b\n")),
            FrameOutcome::Skip(SkipReason::LeadingNewline)
        );
        assert_eq!(filter.process(&frame("B")), FrameOutcome::Emit("B".into()));
        assert_eq!(filter.emitted(), 2);

        assert_eq!(
            filter.process(&frame("\n")),
            FrameOutcome::Emit("\n".into())
        );
    }

    #[test]
    fn test_filter_empty_content_skipped() {
        let mut filter = FragmentFilter::new();
        assert_eq!(
            filter.process(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#),
            FrameOutcome::Skip(SkipReason::Empty)
        );
        assert_eq!(filter.emitted(), 0);
    }

    #[tokio::test]
    async fn test_relay_newline_then_hello() {
        let out = collect(vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"\\n\"}}]}\n\n".to_vec(),
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n".to_vec(),
            b"data: [DONE]\n\n".to_vec(),
        ])
        .await
        .unwrap();
        assert_eq!(out, "Hello");
    }

    #[tokio::test]
    async fn test_relay_skips_malformed_frame() {
        let out = collect(vec![
            b"data: not-json\n\n".to_vec(),
            b"data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\n".to_vec(),
            b"data: [DONE]\n\n".to_vec(),
        ])
        .await
        .unwrap();
        assert_eq!(out, "ok");
    }

    #[tokio::test]
    async fn test_relay_ignores_frames_after_done() {
        let out = collect(vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"one\"}}]}\n\ndata: [DONE]\n\n".to_vec(),
            b"data: {\"choices\":[{\"delta\":{\"content\":\"two\"}}]}\n\n".to_vec(),
        ])
        .await
        .unwrap();
        assert_eq!(out, "one");
    }

    #[tokio::test]
    async fn test_relay_reassembles_split_frames() {
        let out = collect(vec![
            b"data: {\"choices\":[{\"del".to_vec(),
            b"ta\":{\"content\":\"Hi\"}}]}\n".to_vec(),
            b"\n: keep-alive\n\nevent: message\ndata: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\n".to_vec(),
        ])
        .await
        .unwrap();
        assert_eq!(out, "Hi there");
    }

    #[tokio::test]
    async fn test_relay_handles_split_multibyte_sequence() {
        // "é" is 0xC3 0xA9; split it across two chunks
        let out = collect(vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"caf\xC3".to_vec(),
            b"\xA9\"}}]}\n\ndata: [DONE]\n\n".to_vec(),
        ])
        .await
        .unwrap();
        assert_eq!(out, "café");
    }

    #[tokio::test]
    async fn test_relay_ends_when_body_exhausted() {
        let out = collect(vec![b"data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n".to_vec()])
            .await
            .unwrap();
        assert_eq!(out, "partial");
    }

    #[tokio::test]
    async fn test_relay_invalid_utf8_is_fatal() {
        let result = collect(vec![b"data: \xFF\xFE\n\n".to_vec()]).await;
        assert!(matches!(result, Err(RelayError::Decode(_))));
    }

    #[tokio::test]
    async fn test_relay_idle_timeout() {
        let body = stream::pending::<Result<Bytes, Infallible>>();
        let parts: Vec<_> = relay_stream(body, Duration::from_millis(20)).collect().await;
        assert_eq!(parts.len(), 1);
        assert!(matches!(parts[0], Err(RelayError::Timeout { .. })));
    }
}
