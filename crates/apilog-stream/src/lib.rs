//! Server-sent event stream parsing and compaction

mod compactor;
mod parser;
mod stats;
mod types;

pub use compactor::{compact, compact_at, compact_response_body, Compaction};
pub use parser::{is_event_stream, parse_events, EVENT_PREFIX};
pub use stats::{format_bytes, CompactionStats};
pub use types::{CompactedRecord, CompactionAudit, ContentBlock, MessageMetadata, StreamEvent};
