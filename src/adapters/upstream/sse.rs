//! Server-sent event parsing for the upstream chat stream.
//!
//! The upstream reply is a sequence of `data:` lines, each carrying a JSON
//! object with a `message` field, terminated by a literal `data: [DONE]`.
//! Network chunks split lines arbitrarily, so [`SseLineDecoder`] reassembles
//! complete lines across chunk boundaries before they are parsed.

use serde::Deserialize;
use tracing::warn;

/// End-of-reply sentinel payload.
const DONE_SENTINEL: &str = "[DONE]";

/// Prefix marking a data event line.
const DATA_PREFIX: &str = "data: ";

/// One parsed upstream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A non-empty piece of reply text.
    Delta(String),
    /// The end-of-reply sentinel.
    Done,
}

#[derive(Debug, Deserialize)]
struct DataEvent {
    #[serde(default)]
    message: String,
}

/// Parses one complete line from the event stream.
///
/// Returns `None` for everything that carries no reply text: non-data lines,
/// blank keep-alives, data events with an empty `message`, and malformed JSON
/// (logged and skipped, never fatal).
pub fn parse_event_line(line: &str) -> Option<SseEvent> {
    let data = line.strip_prefix(DATA_PREFIX)?;

    if data == DONE_SENTINEL {
        return Some(SseEvent::Done);
    }

    match serde_json::from_str::<DataEvent>(data) {
        Ok(event) if !event.message.is_empty() => Some(SseEvent::Delta(event.message)),
        Ok(_) => None,
        Err(err) => {
            warn!(error = %err, "skipping malformed chat event");
            None
        }
    }
}

/// Reassembles complete lines from arbitrarily split byte chunks.
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buffer: Vec<u8>,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every line completed by it.
    ///
    /// A trailing fragment without a newline stays buffered for the next
    /// chunk. Carriage returns before the newline are stripped. Buffering
    /// happens on raw bytes and decoding per complete line: a chunk boundary
    /// may fall inside a multi-byte UTF-8 sequence, but a newline byte never
    /// does.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&byte| byte == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_data_event_with_message() {
        let event = parse_event_line(r#"data: {"message":"Hello"}"#);
        assert_eq!(event, Some(SseEvent::Delta("Hello".to_string())));
    }

    #[test]
    fn parses_done_sentinel() {
        assert_eq!(parse_event_line("data: [DONE]"), Some(SseEvent::Done));
    }

    #[test]
    fn skips_empty_message_field() {
        assert_eq!(parse_event_line(r#"data: {"message":""}"#), None);
        assert_eq!(parse_event_line(r#"data: {"other":"field"}"#), None);
    }

    #[test]
    fn skips_malformed_json() {
        assert_eq!(parse_event_line("data: {not json"), None);
    }

    #[test]
    fn ignores_non_data_lines() {
        assert_eq!(parse_event_line(""), None);
        assert_eq!(parse_event_line("event: message"), None);
        assert_eq!(parse_event_line(": keep-alive"), None);
    }

    #[test]
    fn decoder_splits_complete_lines() {
        let mut decoder = SseLineDecoder::new();
        let lines = decoder.push(b"data: {\"message\":\"Hi\"}\n\ndata: [DONE]\n");
        assert_eq!(
            lines,
            vec![
                "data: {\"message\":\"Hi\"}".to_string(),
                String::new(),
                "data: [DONE]".to_string(),
            ]
        );
    }

    #[test]
    fn decoder_buffers_partial_lines_across_chunks() {
        let mut decoder = SseLineDecoder::new();
        assert!(decoder.push(b"data: {\"mes").is_empty());
        assert!(decoder.push(b"sage\":\"Hi\"}").is_empty());
        let lines = decoder.push(b"\n");
        assert_eq!(lines, vec!["data: {\"message\":\"Hi\"}".to_string()]);
    }

    #[test]
    fn decoder_keeps_multibyte_chars_split_across_chunks() {
        let bytes = "data: {\"message\":\"héllo\"}\n".as_bytes();
        // Split inside the two-byte encoding of 'é'.
        let (head, tail) = bytes.split_at(20);

        let mut decoder = SseLineDecoder::new();
        assert!(decoder.push(head).is_empty());
        let lines = decoder.push(tail);

        assert_eq!(lines, vec!["data: {\"message\":\"héllo\"}".to_string()]);
        assert_eq!(
            parse_event_line(&lines[0]),
            Some(SseEvent::Delta("héllo".to_string()))
        );
    }

    #[test]
    fn decoder_strips_carriage_returns() {
        let mut decoder = SseLineDecoder::new();
        let lines = decoder.push(b"data: [DONE]\r\n");
        assert_eq!(lines, vec!["data: [DONE]".to_string()]);
    }
}
