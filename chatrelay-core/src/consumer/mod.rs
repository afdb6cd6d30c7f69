//! Client-side consumer of the relay's text stream
//!
//! [`StreamConsumer`] posts a [`ChatRequest`] to the relay, reads the
//! response body as it arrives and reports the accumulated text through
//! injected [`CompletionCallbacks`]. At most one stream is in flight per
//! consumer: starting a new one cancels the previous one.
//!
//! ```text
//! Idle --get_stream--> Streaming --(end | error | cancel)--> Idle
//! ```

mod callbacks;
mod decode;

pub use callbacks::{CompletionCallbacks, FnCallbacks};

use crate::protocol::ChatRequest;
use decode::Utf8Accumulator;
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Errors that end a stream early
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("Invalid relay endpoint: {0}")]
    Endpoint(String),

    #[error("Relay request failed: {0}")]
    Transport(String),

    #[error("Relay stream is not valid UTF-8: {0}")]
    Decode(String),
}

/// How a stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The relay closed the body
    Completed { text: String },
    /// [`StreamConsumer::cancel`] or a newer `get_stream` stopped it
    Cancelled { text: String },
}

impl StreamOutcome {
    /// Text received before the stream ended
    pub fn text(&self) -> &str {
        match self {
            StreamOutcome::Completed { text } | StreamOutcome::Cancelled { text } => text,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StreamOutcome::Cancelled { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Idle,
    Streaming,
}

struct InFlight {
    generation: u64,
    token: CancellationToken,
}

/// Reads relay responses and forwards them to a [`CompletionCallbacks`]
pub struct StreamConsumer {
    client: Client,
    endpoint: Url,
    callbacks: Arc<dyn CompletionCallbacks>,
    inflight: Mutex<Option<InFlight>>,
    /// Held while `on_completing` runs so that cancellation can wait it out
    delivery: Mutex<()>,
    /// Thread currently inside `on_completing`, if any
    delivering: Mutex<Option<ThreadId>>,
    generation: AtomicU64,
}

impl StreamConsumer {
    /// Consumer for the relay route at `endpoint`
    pub fn new(
        endpoint: &str,
        callbacks: Arc<dyn CompletionCallbacks>,
    ) -> Result<Self, ConsumerError> {
        Self::with_client(Client::new(), endpoint, callbacks)
    }

    pub fn with_client(
        client: Client,
        endpoint: &str,
        callbacks: Arc<dyn CompletionCallbacks>,
    ) -> Result<Self, ConsumerError> {
        let endpoint = Url::parse(endpoint).map_err(|e| ConsumerError::Endpoint(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            callbacks,
            inflight: Mutex::new(None),
            delivery: Mutex::new(()),
            delivering: Mutex::new(None),
            generation: AtomicU64::new(0),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn state(&self) -> ConsumerState {
        if self.slot().is_some() {
            ConsumerState::Streaming
        } else {
            ConsumerState::Idle
        }
    }

    /// Stream one completion.
    ///
    /// Any stream already in flight is cancelled first. `on_completing`
    /// receives the accumulated text after every chunk that adds text;
    /// `on_completed` fires once when this call finishes for any reason,
    /// including the future being dropped. A relay error status is not
    /// special-cased: its body is delivered like any other.
    pub async fn get_stream(&self, request: &ChatRequest) -> Result<StreamOutcome, ConsumerError> {
        let (generation, token) = self.begin();
        let _completion = Completion {
            consumer: self,
            generation,
        };

        let mut text = String::new();
        let send = self.client.post(self.endpoint.clone()).json(request).send();

        let mut response = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(StreamOutcome::Cancelled { text }),
            result = send => result.map_err(|e| ConsumerError::Transport(e.to_string()))?,
        };

        if !response.status().is_success() {
            warn!(
                "Relay responded with {} [generation: {}]",
                response.status(),
                generation
            );
        }

        let mut decoder = Utf8Accumulator::default();
        loop {
            let chunk = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("Stream cancelled [generation: {}]", generation);
                    return Ok(StreamOutcome::Cancelled { text });
                }
                chunk = response.chunk() => {
                    chunk.map_err(|e| ConsumerError::Transport(e.to_string()))?
                }
            };

            let Some(chunk) = chunk else {
                break;
            };

            if decoder.push(&chunk, &mut text)? {
                let _delivery = self.delivery();
                if token.is_cancelled() {
                    return Ok(StreamOutcome::Cancelled { text });
                }
                self.deliver(&text);
            }
        }

        decoder.finish()?;
        debug!(
            "Stream completed with {} bytes [generation: {}]",
            text.len(),
            generation
        );
        Ok(StreamOutcome::Completed { text })
    }

    /// Abort the in-flight stream. Returns `false` when there was none.
    ///
    /// Once this returns, the cancelled stream makes no further
    /// `on_completing` call. It may be called from inside `on_completing`:
    /// the delivery in progress finishes and nothing follows it.
    pub fn cancel(&self) -> bool {
        let inflight = self.slot().take();
        match inflight {
            Some(inflight) => {
                debug!("Cancelling stream [generation: {}]", inflight.generation);
                inflight.token.cancel();
                self.wait_for_delivery();
                true
            }
            None => false,
        }
    }

    fn begin(&self) -> (u64, CancellationToken) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();

        let previous = self.slot().replace(InFlight {
            generation,
            token: token.clone(),
        });
        if let Some(previous) = previous {
            debug!(
                "Superseding stream [generation: {} -> {}]",
                previous.generation, generation
            );
            previous.token.cancel();
            self.wait_for_delivery();
        }

        (generation, token)
    }

    fn release(&self, generation: u64) {
        let mut slot = self.slot();
        if slot
            .as_ref()
            .is_some_and(|inflight| inflight.generation == generation)
        {
            *slot = None;
        }
    }

    fn deliver(&self, text: &str) {
        let _marker = DeliveringMarker::set(self);
        self.callbacks.on_completing(text);
    }

    /// Block until no other thread is inside `on_completing`
    fn wait_for_delivery(&self) {
        if *self.delivering_thread() == Some(thread::current().id()) {
            return;
        }
        drop(self.delivery());
    }

    fn slot(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn delivery(&self) -> MutexGuard<'_, ()> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn delivering_thread(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.delivering.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Records the delivering thread for the duration of one callback
struct DeliveringMarker<'a> {
    consumer: &'a StreamConsumer,
}

impl<'a> DeliveringMarker<'a> {
    fn set(consumer: &'a StreamConsumer) -> Self {
        *consumer.delivering_thread() = Some(thread::current().id());
        Self { consumer }
    }
}

impl Drop for DeliveringMarker<'_> {
    fn drop(&mut self) {
        *self.consumer.delivering_thread() = None;
    }
}

/// Releases the in-flight slot and fires `on_completed` when a stream ends
struct Completion<'a> {
    consumer: &'a StreamConsumer,
    generation: u64,
}

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        self.consumer.release(self.generation);
        self.consumer.callbacks.on_completed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl CompletionCallbacks for Silent {
        fn on_completing(&self, _text: &str) {}
        fn on_completed(&self) {}
    }

    #[test]
    fn test_cancel_when_idle_is_noop() {
        let consumer = StreamConsumer::new("http://127.0.0.1:9/api/chat", Arc::new(Silent)).unwrap();
        assert_eq!(consumer.state(), ConsumerState::Idle);
        assert!(!consumer.cancel());
        assert_eq!(consumer.state(), ConsumerState::Idle);
    }

    #[test]
    fn test_invalid_endpoint() {
        let result = StreamConsumer::new("not a url", Arc::new(Silent));
        assert!(matches!(result, Err(ConsumerError::Endpoint(_))));
    }

    #[test]
    fn test_outcome_text() {
        let outcome = StreamOutcome::Cancelled {
            text: "partial".to_string(),
        };
        assert_eq!(outcome.text(), "partial");
        assert!(outcome.is_cancelled());
    }
}
