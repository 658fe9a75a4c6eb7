use crate::parser::parse_events;
use crate::stats::CompactionStats;
use crate::types::{
    CompactedRecord, CompactionAudit, ContentBlock, ContentDelta, MessageMetadata, StreamEvent,
    Usage,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::borrow::Cow;

/// Result of folding an event stream into a single record
#[derive(Debug, Clone)]
pub struct Compaction {
    pub record: CompactedRecord,
    /// `record` serialized as JSON
    pub body: String,
    pub stats: CompactionStats,
}

/// Compact a streaming response body, stamping the audit with the current time.
///
/// Returns `None` when the body is not an event stream or no payload in it
/// could be decoded; callers keep the original text in that case.
pub fn compact(raw: &str) -> Option<Compaction> {
    compact_at(raw, Utc::now())
}

/// Same as [`compact`] with an explicit audit timestamp
pub fn compact_at(raw: &str, compacted_at: DateTime<Utc>) -> Option<Compaction> {
    let events = parse_events(raw)?;
    if events.is_empty() {
        return None;
    }

    let mut acc = Accumulator::default();
    for event in events {
        acc.fold(event);
    }

    let record = acc.finish(compacted_at);
    let body = serde_json::to_string(&record).ok()?;
    let stats = CompactionStats::new(raw.len(), body.len());

    Some(Compaction {
        record,
        body,
        stats,
    })
}

/// The body to persist: the compacted JSON for event streams, `raw` otherwise
pub fn compact_response_body(raw: &str) -> Cow<'_, str> {
    match compact(raw) {
        Some(compaction) => Cow::Owned(compaction.body),
        None => Cow::Borrowed(raw),
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    metadata: Option<MessageMetadata>,
    usage: Usage,
    fragments: Vec<String>,
    events: usize,
}

impl Accumulator {
    fn fold(&mut self, event: StreamEvent) {
        self.events += 1;

        match event {
            StreamEvent::MessageStart { mut message } => {
                if self.metadata.is_some() {
                    return;
                }
                if let Some(Value::Object(usage)) = message.usage.take() {
                    if !usage.is_empty() {
                        self.usage = usage;
                    }
                }
                self.metadata = Some(MessageMetadata::from_message(message));
            }
            // Thinking and text land in the same buffer with no boundary marker
            StreamEvent::ContentBlockDelta { delta } => match delta {
                ContentDelta::TextDelta { text } => self.fragments.push(text),
                ContentDelta::ThinkingDelta { thinking } => self.fragments.push(thinking),
                ContentDelta::Other => {}
            },
            StreamEvent::MessageDelta { delta, usage } => {
                if let Some(reason) = delta.stop_reason.filter(is_present) {
                    self.metadata
                        .get_or_insert_with(MessageMetadata::empty)
                        .stop_reason = Some(reason);
                }
                if let Some(Value::Object(usage)) = usage {
                    // Later counters overwrite earlier ones key by key
                    self.usage.extend(usage);
                }
            }
            StreamEvent::Other => {}
        }
    }

    fn finish(self, compacted_at: DateTime<Utc>) -> CompactedRecord {
        CompactedRecord {
            metadata: self.metadata,
            content: vec![ContentBlock::text(self.fragments.concat())],
            usage: self.usage,
            audit: CompactionAudit {
                original_chunks: self.events,
                compacted_at,
            },
        }
    }
}

/// Null and empty strings never refine a stop reason
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
