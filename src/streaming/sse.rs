use crate::models::StreamChunk;
use serde_json::Value;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";
pub const CONTENT_FRAME: &str = "content";

/// Used when an error frame carries no message.
pub const DEFAULT_STREAM_ERROR: &str = "Streaming request failed";

/// Longest unterminated line the reader will hold before giving up.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Accumulates decoded text and hands back complete lines.
///
/// After every [`push`](Self::push) the buffer holds at most one partial
/// line: the text after the last newline seen so far.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buffer: String,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text and drain every newline-terminated line, in order.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };

        let tail = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, tail);

        complete[..last_newline]
            .split('\n')
            .map(str::to_string)
            .collect()
    }

    /// The unterminated tail still waiting for its newline.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// What one complete `data:` line means to the reader.
#[derive(Debug, Clone, PartialEq)]
pub enum SseFrame {
    /// The `[DONE]` sentinel
    Done,
    Content(StreamChunk),
    /// An `{"error": ..., "message": ...}` frame
    Error(String),
    /// A well-formed frame of a type this client does not surface
    Other(String),
    /// Data that is not valid JSON
    Malformed { data: String, reason: String },
}

/// Classify a single line. Returns `None` for anything that is not a
/// `data: ` line (comments, keep-alives, blank separators, `event:` fields).
pub fn parse_line(line: &str) -> Option<SseFrame> {
    let data = line.strip_prefix(DATA_PREFIX)?.trim();

    if data == DONE_SENTINEL {
        return Some(SseFrame::Done);
    }

    let payload: Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => {
            return Some(SseFrame::Malformed {
                data: data.to_string(),
                reason: e.to_string(),
            });
        }
    };

    if payload.get("error").is_some_and(is_truthy) {
        return Some(SseFrame::Error(error_message(&payload)));
    }

    let frame_type = payload
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if frame_type != CONTENT_FRAME {
        return Some(SseFrame::Other(frame_type));
    }

    Some(match serde_json::from_value::<StreamChunk>(payload) {
        Ok(chunk) => SseFrame::Content(chunk),
        Err(e) => SseFrame::Malformed {
            data: data.to_string(),
            reason: e.to_string(),
        },
    })
}

fn error_message(payload: &Value) -> String {
    match payload.get("message") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        None | Some(Value::Null) | Some(Value::String(_)) => DEFAULT_STREAM_ERROR.to_string(),
        Some(other) => other.to_string(),
    }
}

/// JSON truthiness as a loosely-typed backend would mean it.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
