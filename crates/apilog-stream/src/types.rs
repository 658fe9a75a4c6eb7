//! Stream event payloads and the compacted record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Token and resource counters reported by the upstream API
pub type Usage = Map<String, Value>;

/// One decoded `data:` payload, discriminated by its `type` field
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart {
        #[serde(default)]
        message: MessageStart,
    },
    ContentBlockDelta {
        #[serde(default)]
        delta: ContentDelta,
    },
    MessageDelta {
        #[serde(default)]
        delta: MessageDeltaBody,
        #[serde(default)]
        usage: Option<Value>,
    },
    /// Any other event type (ping, content_block_start, ...) or an object
    /// without a recognizable shape
    #[serde(other)]
    Other,
}

/// The message object embedded in a `message_start` event.
///
/// Fields are kept as raw JSON so one oddly typed value doesn't cost the rest.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageStart {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub role: Option<Value>,
    #[serde(default)]
    pub model: Option<Value>,
    #[serde(default)]
    pub stop_reason: Option<Value>,
    #[serde(default)]
    pub stop_sequence: Option<Value>,
    /// Seeds the usage map when it is a non-empty object
    #[serde(default)]
    pub usage: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentDelta {
    TextDelta {
        #[serde(default)]
        text: String,
    },
    ThinkingDelta {
        #[serde(default)]
        thinking: String,
    },
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageDeltaBody {
    #[serde(default)]
    pub stop_reason: Option<Value>,
}

/// Message identity fields, flattened to the top level of the record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub id: Option<Value>,
    #[serde(rename = "type")]
    pub kind: String,
    pub role: Option<Value>,
    pub model: Option<Value>,
    pub stop_reason: Option<Value>,
    pub stop_sequence: Option<Value>,
}

impl MessageMetadata {
    pub(crate) fn from_message(message: MessageStart) -> Self {
        Self {
            id: message.id,
            kind: "message".to_string(),
            role: message.role,
            model: message.model,
            stop_reason: message.stop_reason,
            stop_sequence: message.stop_sequence,
        }
    }

    pub(crate) fn empty() -> Self {
        Self::from_message(MessageStart::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactionAudit {
    pub original_chunks: usize,
    pub compacted_at: DateTime<Utc>,
}

/// A whole streamed response folded into one message-shaped record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactedRecord {
    #[serde(flatten)]
    pub metadata: Option<MessageMetadata>,
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
    #[serde(rename = "_compacted")]
    pub audit: CompactionAudit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_discriminators() {
        let start: StreamEvent = serde_json::from_str(
            r#"{"type":"message_start","message":{"id":"msg_1","role":"assistant"}}"#,
        )
        .unwrap();
        assert!(matches!(start, StreamEvent::MessageStart { .. }));

        let ping: StreamEvent = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(ping, StreamEvent::Other);
    }

    #[test]
    fn test_unknown_delta_type_is_other() {
        let event: StreamEvent = serde_json::from_str(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            StreamEvent::ContentBlockDelta {
                delta: ContentDelta::Other
            }
        );
    }

    #[test]
    fn test_record_without_metadata_omits_identity_fields() {
        let record = CompactedRecord {
            metadata: None,
            content: vec![ContentBlock::text("x")],
            usage: Usage::new(),
            audit: CompactionAudit {
                original_chunks: 1,
                compacted_at: Utc::now(),
            },
        };
        let json: Value = serde_json::to_value(&record).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["_compacted"]["original_chunks"], 1);
    }
}
