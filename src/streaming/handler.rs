use crate::models::StreamChunk;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// How a streamed request ended. Exactly one per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    Errored(String),
    /// Stopped by the caller; not a failure
    Cancelled,
}

/// One event delivered to a channel consumer
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Chunk(StreamChunk),
    Error(String),
    Complete,
}

/// Receiver of a streamed reply.
///
/// Calls arrive in stream order. `on_complete` or `on_error` is the last call
/// for a request and at most one of them happens; a cancelled request gets
/// neither.
pub trait StreamHandler {
    fn on_chunk(&mut self, chunk: StreamChunk);

    fn on_error(&mut self, message: String);

    fn on_complete(&mut self);
}

impl<H: StreamHandler + ?Sized> StreamHandler for &mut H {
    fn on_chunk(&mut self, chunk: StreamChunk) {
        (**self).on_chunk(chunk)
    }

    fn on_error(&mut self, message: String) {
        (**self).on_error(message)
    }

    fn on_complete(&mut self) {
        (**self).on_complete()
    }
}

/// Handler assembled from three closures
pub struct StreamCallbacks<C, E, D> {
    on_chunk: C,
    on_error: E,
    on_complete: D,
}

impl<C, E, D> StreamCallbacks<C, E, D>
where
    C: FnMut(StreamChunk),
    E: FnMut(String),
    D: FnMut(),
{
    pub fn new(on_chunk: C, on_error: E, on_complete: D) -> Self {
        Self {
            on_chunk,
            on_error,
            on_complete,
        }
    }
}

impl<C, E, D> StreamHandler for StreamCallbacks<C, E, D>
where
    C: FnMut(StreamChunk),
    E: FnMut(String),
    D: FnMut(),
{
    fn on_chunk(&mut self, chunk: StreamChunk) {
        (self.on_chunk)(chunk)
    }

    fn on_error(&mut self, message: String) {
        (self.on_error)(message)
    }

    fn on_complete(&mut self) {
        (self.on_complete)()
    }
}

/// Forward events to a channel. A dropped receiver just loses the events.
impl StreamHandler for UnboundedSender<StreamEvent> {
    fn on_chunk(&mut self, chunk: StreamChunk) {
        if self.send(StreamEvent::Chunk(chunk)).is_err() {
            debug!("Stream receiver dropped, discarding chunk");
        }
    }

    fn on_error(&mut self, message: String) {
        if self.send(StreamEvent::Error(message)).is_err() {
            debug!("Stream receiver dropped, discarding error");
        }
    }

    fn on_complete(&mut self) {
        if self.send(StreamEvent::Complete).is_err() {
            debug!("Stream receiver dropped, discarding completion");
        }
    }
}

/// Collect events in memory.
impl StreamHandler for Vec<StreamEvent> {
    fn on_chunk(&mut self, chunk: StreamChunk) {
        self.push(StreamEvent::Chunk(chunk));
    }

    fn on_error(&mut self, message: String) {
        self.push(StreamEvent::Error(message));
    }

    fn on_complete(&mut self) {
        self.push(StreamEvent::Complete);
    }
}
