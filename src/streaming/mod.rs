pub mod decoder;
pub mod handler;
pub mod reader;
pub mod sse;

pub use decoder::Utf8StreamDecoder;
pub use handler::{StreamCallbacks, StreamEvent, StreamHandler, StreamOutcome};
pub use reader::read_event_stream;
pub use sse::{SseFrame, SseLineBuffer, parse_line};
