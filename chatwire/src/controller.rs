//! The session controller: one streaming request at a time, cancellable.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chatwire_types::{
    Delta, Message, MessageId, SessionEvent, SessionStatus, Snapshot, StreamError,
};
use futures::StreamExt;
use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;

use crate::assembler::MessageAssembler;
use crate::config::StreamConfig;
use crate::pipeline::ChunkPipeline;
use crate::transport::{StreamRequest, Transport};

/// Receives every visible change of the in-flight message.
///
/// Callbacks run on the task driving [`StreamController::start`], outside
/// the controller's lock, so they may call back into the controller.
pub trait RenderSink: Send + Sync {
    /// Called after every applied delta and every status transition.
    fn on_message_updated(&self, message: &Message, status: SessionStatus);

    /// Called once per session when it fails.
    fn on_error(&self, error: &StreamError) {
        let _ = error;
    }
}

/// A [`RenderSink`] that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl RenderSink for NoopSink {
    fn on_message_updated(&self, _message: &Message, _status: SessionStatus) {}
}

/// How a call to [`StreamController::start`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// A session was already in flight; nothing was sent.
    Rejected {
        /// Status of the session that was in flight.
        status: SessionStatus,
    },
    /// The session ran to a terminal status.
    Finished(Snapshot),
}

#[derive(Debug, Default)]
struct Shared {
    status: SessionStatus,
    generation: u64,
    assembler: MessageAssembler,
    cancel: CancellationToken,
}

/// Drives one streaming session at a time from request to terminal status.
///
/// Each chunk is decoded, split into frames, parsed and folded into the
/// assistant message before the next chunk is awaited. [`abort`] and
/// [`request_stop`] may be called from any task while [`start`] is running.
///
/// [`abort`]: StreamController::abort
/// [`request_stop`]: StreamController::request_stop
/// [`start`]: StreamController::start
pub struct StreamController<T> {
    transport: T,
    config: StreamConfig,
    sink: Arc<dyn RenderSink>,
    shared: Mutex<Shared>,
}

impl<T: Transport> StreamController<T> {
    /// Create a controller with a [`NoopSink`].
    #[must_use]
    pub fn new(transport: T, config: StreamConfig) -> Self {
        Self {
            transport,
            config,
            sink: Arc::new(NoopSink),
            shared: Mutex::new(Shared::default()),
        }
    }

    /// Set the render sink.
    #[must_use]
    pub fn sink(mut self, sink: impl RenderSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Set a shared render sink.
    #[must_use]
    pub fn shared_sink(mut self, sink: Arc<dyn RenderSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The configuration this controller was built with.
    #[must_use]
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Current session status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.lock().status
    }

    /// Current status together with a copy of the assistant message.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let shared = self.lock();
        Snapshot {
            status: shared.status,
            message: shared.assembler.message().cloned(),
        }
    }

    /// Run one session: POST `body` to the configured endpoint and stream
    /// the answer into a fresh assistant message.
    ///
    /// Resolves once the session is terminal. While another session is in
    /// flight the call is rejected without side effects.
    pub async fn start(&self, body: serde_json::Value, headers: HeaderMap) -> StartOutcome {
        let (generation, cancel, placeholder) = {
            let mut shared = self.lock();
            let Some(next) = shared.status.on(SessionEvent::Submit) else {
                tracing::debug!(status = %shared.status, "start rejected, session in flight");
                return StartOutcome::Rejected {
                    status: shared.status,
                };
            };
            shared.status = next;
            shared.generation += 1;
            shared.cancel = CancellationToken::new();
            let placeholder = Message::assistant_pending(MessageId::generate());
            shared.assembler.begin(placeholder.clone());
            (shared.generation, shared.cancel.clone(), placeholder)
        };
        self.sink
            .on_message_updated(&placeholder, SessionStatus::Requesting);

        let request = StreamRequest {
            endpoint: self.config.endpoint.clone(),
            body,
            headers,
        };
        tracing::debug!(generation, url = %request.endpoint, "session started");

        let mut guard = SessionGuard {
            controller: self,
            generation,
            armed: true,
        };
        let result = self.drive(generation, &placeholder.id, &cancel, request).await;
        guard.armed = false;

        match result {
            Ok(()) => {
                self.conclude(generation, SessionEvent::Finish);
            }
            Err(error) if error.is_abort() => {
                tracing::debug!(generation, "session ended by caller");
            }
            Err(error) => {
                tracing::warn!(generation, %error, "session failed");
                if self.conclude(generation, SessionEvent::Fail) {
                    self.sink.on_error(&error);
                }
            }
        }

        StartOutcome::Finished(self.snapshot())
    }

    /// Abort the in-flight session.
    ///
    /// Cancels the request, releases the reader and moves to `Aborted`. The
    /// partial message keeps its content. Does nothing when no session is in
    /// flight.
    pub fn abort(&self) {
        self.interrupt(SessionEvent::Abort);
    }

    /// Stop the in-flight session early and keep what arrived so far.
    ///
    /// The message is sealed complete and the session ends as `Completed`.
    /// Does nothing when no session is in flight.
    pub fn request_stop(&self) {
        self.interrupt(SessionEvent::Finish);
    }

    async fn drive(
        &self,
        generation: u64,
        id: &MessageId,
        cancel: &CancellationToken,
        request: StreamRequest,
    ) -> Result<(), StreamError> {
        let mut body = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(StreamError::Aborted),
            submitted = self.transport.submit(request) => submitted?,
        };
        let mut pipeline = ChunkPipeline::new(self.config.max_frame_bytes);

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(StreamError::Aborted),
                next = body.next() => next,
            };
            let Some(chunk) = next else { break };
            let chunk = chunk?;
            tracing::trace!(generation, len = chunk.len(), "chunk received");

            self.first_chunk(generation)?;
            let deltas = pipeline.ingest(&chunk)?;
            if self.apply_all(generation, id, deltas)? {
                return Ok(());
            }
        }

        tracing::debug!(generation, "byte stream ended");
        let deltas = pipeline.finish()?;
        self.apply_all(generation, id, deltas)?;
        if pipeline.skipped() > 0 {
            tracing::debug!(generation, skipped = pipeline.skipped(), "frames skipped");
        }
        Ok(())
    }

    /// Move `Requesting` to `Streaming`. Fails with `Aborted` when the
    /// session is no longer the current, active one.
    fn first_chunk(&self, generation: u64) -> Result<(), StreamError> {
        let update = {
            let mut shared = self.lock();
            if shared.generation != generation || !shared.status.is_active() {
                return Err(StreamError::Aborted);
            }
            match shared.status.on(SessionEvent::FirstChunk) {
                Some(next) => {
                    log_transition(generation, shared.status, next);
                    shared.status = next;
                    shared.assembler.message().cloned()
                }
                None => None,
            }
        };
        if let Some(message) = update {
            self.sink
                .on_message_updated(&message, SessionStatus::Streaming);
        }
        Ok(())
    }

    /// Apply deltas one by one. Returns `true` once an end delta was applied.
    fn apply_all(
        &self,
        generation: u64,
        id: &MessageId,
        deltas: Vec<Delta>,
    ) -> Result<bool, StreamError> {
        for delta in deltas {
            let is_end = delta.is_end;
            let update = {
                let mut shared = self.lock();
                if shared.generation != generation || !shared.status.is_active() {
                    return Err(StreamError::Aborted);
                }
                let status = shared.status;
                shared
                    .assembler
                    .apply(id, delta)
                    .map(|message| (message.clone(), status))
            };
            if let Some((message, status)) = update {
                self.sink.on_message_updated(&message, status);
            }
            if is_end {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Terminal transition from inside the session's own future. Returns
    /// whether the transition happened.
    fn conclude(&self, generation: u64, event: SessionEvent) -> bool {
        let update = {
            let mut shared = self.lock();
            if shared.generation != generation {
                return false;
            }
            let Some(next) = shared.status.on(event) else {
                return false;
            };
            log_transition(generation, shared.status, next);
            shared.status = next;
            seal(&mut shared.assembler, event);
            shared.assembler.message().cloned()
        };
        if let Some(message) = update {
            self.sink.on_message_updated(&message, next_status(event));
        }
        true
    }

    /// Terminal transition requested from outside the session's future.
    fn interrupt(&self, event: SessionEvent) {
        let update = {
            let mut shared = self.lock();
            let Some(next) = shared.status.on(event) else {
                tracing::debug!(status = %shared.status, ?event, "nothing to interrupt");
                return;
            };
            log_transition(shared.generation, shared.status, next);
            shared.status = next;
            shared.cancel.cancel();
            seal(&mut shared.assembler, event);
            shared.assembler.message().cloned()
        };
        if let Some(message) = update {
            self.sink.on_message_updated(&message, next_status(event));
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Ends a session as `Aborted` when its `start` future is dropped before
/// the session reached a terminal status.
struct SessionGuard<'a, T: Transport> {
    controller: &'a StreamController<T>,
    generation: u64,
    armed: bool,
}

impl<T: Transport> Drop for SessionGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(generation = self.generation, "start future dropped mid-session");
            self.controller.conclude(self.generation, SessionEvent::Abort);
        }
    }
}

impl<T> std::fmt::Debug for StreamController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamController")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn seal(assembler: &mut MessageAssembler, event: SessionEvent) {
    match event {
        SessionEvent::Finish => {
            assembler.finish();
        }
        SessionEvent::Fail => {
            assembler.fail();
        }
        SessionEvent::Abort => {
            assembler.abandon();
        }
        SessionEvent::Submit | SessionEvent::FirstChunk => {}
    }
}

fn next_status(event: SessionEvent) -> SessionStatus {
    match event {
        SessionEvent::Finish => SessionStatus::Completed,
        SessionEvent::Fail => SessionStatus::Errored,
        SessionEvent::Abort => SessionStatus::Aborted,
        SessionEvent::Submit => SessionStatus::Requesting,
        SessionEvent::FirstChunk => SessionStatus::Streaming,
    }
}

fn log_transition(generation: u64, from: SessionStatus, to: SessionStatus) {
    tracing::debug!(generation, %from, %to, "session transition");
}
