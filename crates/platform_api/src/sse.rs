use serde_json::Value;

use crate::events::{ParsedStreamEvent, DEFAULT_EVENT_NAME};
use crate::response::raw_text_fallback;

const FRAME_SEPARATOR: &str = "\n\n";

/// Events completed by one parse call plus the unconsumed tail.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedChunk {
    pub events: Vec<ParsedStreamEvent>,
    /// Text after the last frame separator. Prepend it to the next chunk.
    pub remainder: String,
}

/// Decode every complete frame in `buffer`.
///
/// Pure: the caller owns buffering and must prepend `remainder` to the next
/// chunk. Every frame yields an event: a missing name is `message` and
/// missing data is `null`, so comment-only keepalives come through too.
pub fn parse_event_buffer(buffer: &str) -> ParsedChunk {
    let normalized = buffer.replace("\r\n", "\n");
    let mut segments = normalized.split(FRAME_SEPARATOR).collect::<Vec<_>>();
    let remainder = segments.pop().unwrap_or_default().to_string();

    let events = segments.into_iter().map(parse_frame).collect();

    ParsedChunk { events, remainder }
}

fn parse_frame(frame: &str) -> ParsedStreamEvent {
    let mut event = None;
    let mut data_lines = Vec::new();

    for line in frame.split('\n') {
        if line.starts_with(':') {
            continue;
        }
        if let Some(name) = line.strip_prefix("event:") {
            event = Some(name.trim().to_string());
            continue;
        }
        if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.trim_start());
        }
    }

    let event = event
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string());

    ParsedStreamEvent {
        event,
        data: parse_event_data(&data_lines.join("\n")),
    }
}

/// Parse an event payload as JSON. Never fails: empty is `null`, anything
/// unparsable is wrapped as plain text.
pub fn parse_event_data(raw: &str) -> Value {
    let text = raw.trim();
    if text.is_empty() {
        return Value::Null;
    }

    serde_json::from_str::<Value>(text).unwrap_or_else(|_| raw_text_fallback(raw, "text/plain"))
}

/// Incremental parser over raw byte chunks.
///
/// Owns the text remainder between chunks and holds back UTF-8 sequences
/// split across chunk boundaries.
#[derive(Debug, Default)]
pub struct SseStreamParser {
    pending_bytes: Vec<u8>,
    buffer: String,
}

impl SseStreamParser {
    /// Feed arbitrary bytes into the parser and drain complete events.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<ParsedStreamEvent> {
        self.pending_bytes.extend_from_slice(bytes);
        let decoded = decode_utf8_prefix(&mut self.pending_bytes);
        self.feed_text(&decoded)
    }

    /// Feed already-decoded text.
    pub fn feed_text(&mut self, text: &str) -> Vec<ParsedStreamEvent> {
        self.buffer.push_str(text);
        let parsed = parse_event_buffer(&self.buffer);
        self.buffer = parsed.remainder;
        parsed.events
    }

    /// Flush after the stream ends. Complete frames still buffered are
    /// returned; an incomplete trailing frame is dropped.
    pub fn finish(&mut self) -> Vec<ParsedStreamEvent> {
        let tail = String::from_utf8_lossy(&self.pending_bytes).into_owned();
        self.pending_bytes.clear();
        let events = self.feed_text(&tail);
        self.buffer.clear();
        events
    }

    /// Parse a complete payload string in one shot.
    pub fn parse_frames(input: &str) -> Vec<ParsedStreamEvent> {
        parse_event_buffer(input).events
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.trim().is_empty() && self.pending_bytes.is_empty()
    }
}

fn decode_utf8_prefix(pending: &mut Vec<u8>) -> String {
    let mut out = String::new();

    loop {
        match std::str::from_utf8(pending) {
            Ok(text) => {
                out.push_str(text);
                pending.clear();
                return out;
            }
            Err(error) => {
                let valid = error.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&pending[..valid]));
                match error.error_len() {
                    None => {
                        pending.drain(..valid);
                        return out;
                    }
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        pending.drain(..valid + len);
                    }
                }
            }
        }
    }
}
