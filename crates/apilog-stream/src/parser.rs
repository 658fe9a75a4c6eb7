//! Line-oriented decoding of server-sent event bodies

use crate::types::StreamEvent;
use serde_json::Value;

/// Declaration line every event-stream body starts with
pub const EVENT_PREFIX: &str = "event:";

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// True when the body, ignoring leading whitespace, opens with an event declaration
pub fn is_event_stream(raw: &str) -> bool {
    raw.trim_start().starts_with(EVENT_PREFIX)
}

/// Decode every `data:` payload of an event stream, in delivery order.
///
/// Returns `None` when `raw` is not an event stream at all. Payloads that
/// are empty, the `[DONE]` sentinel, not valid JSON, or not a JSON object
/// are skipped: a transport may cut a stream off mid-line.
pub fn parse_events(raw: &str) -> Option<Vec<StreamEvent>> {
    if !is_event_stream(raw) {
        return None;
    }

    Some(
        raw.split('\n')
            .filter_map(data_payload)
            .filter_map(decode_event)
            .collect(),
    )
}

fn data_payload(line: &str) -> Option<&str> {
    let payload = line.trim().strip_prefix(DATA_PREFIX)?.trim();
    if payload.is_empty() || payload == DONE_SENTINEL {
        None
    } else {
        Some(payload)
    }
}

fn decode_event(payload: &str) -> Option<StreamEvent> {
    let value: Value = serde_json::from_str(payload).ok()?;
    if !value.is_object() {
        return None;
    }
    // A well-formed object that doesn't match a known event shape still counts
    Some(serde_json::from_value(value).unwrap_or(StreamEvent::Other))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentDelta;

    #[test]
    fn test_detection_ignores_leading_whitespace() {
        assert!(is_event_stream("event: message_start\n"));
        assert!(is_event_stream("\n  \tevent: ping\n"));
        assert!(!is_event_stream("{\"id\":\"msg_1\"}"));
        assert!(!is_event_stream("data: {}\n"));
        assert!(!is_event_stream(""));
    }

    #[test]
    fn test_not_a_stream_returns_none() {
        assert!(parse_events("{\"type\":\"message\"}").is_none());
    }

    #[test]
    fn test_skips_sentinel_empty_and_malformed_payloads() {
        let raw = "event: content_block_delta\n\
                   data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"ok\"}}\n\
                   data:\n\
                   data: [DONE]\n\
                   data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_de\n\
                   data: 42\n";
        let events = parse_events(raw).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            StreamEvent::ContentBlockDelta {
                delta: ContentDelta::TextDelta {
                    text: "ok".to_string()
                }
            }
        );
    }

    #[test]
    fn test_handles_crlf_line_endings() {
        let raw = "event: ping\r\ndata: {\"type\":\"ping\"}\r\n\r\n";
        let events = parse_events(raw).unwrap();
        assert_eq!(events, vec![StreamEvent::Other]);
    }

    #[test]
    fn test_object_without_type_counts_as_other() {
        let raw = "event: x\ndata: {\"hello\":1}\n";
        assert_eq!(parse_events(raw).unwrap(), vec![StreamEvent::Other]);
    }

    #[test]
    fn test_ignores_non_data_lines() {
        let raw = "event: message_stop\nid: 7\n: comment\ndata: {\"type\":\"message_stop\"}\n";
        assert_eq!(parse_events(raw).unwrap().len(), 1);
    }
}
