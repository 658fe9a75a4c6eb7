//! One-time rewrite of stored event-stream responses into compacted records.
//!
//! New rows are compacted before insert, so this only ever sees history.
//! Compacted bodies no longer start with `event:`, which keeps the scan
//! from picking a row up twice if the job is interrupted and re-run.

use crate::migration::RoutineError;
use crate::storage::{streaming_candidates, update_response_body, vacuum};
use apilog_stream::{compact, CompactionStats};
use rusqlite::Connection;
use tracing::info;

pub const ID: &str = "003_compact_streaming_responses";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkCompactionReport {
    /// Rows whose body looked like an event stream
    pub scanned: usize,
    /// Rows actually rewritten
    pub rewritten: usize,
    /// Byte totals over rewritten rows only
    pub stats: CompactionStats,
}

pub(crate) fn migrate(conn: &Connection) -> Result<(), RoutineError> {
    compact_stored_responses(conn)?;
    Ok(())
}

/// Compact every stored streaming response, then VACUUM if anything changed
pub fn compact_stored_responses(conn: &Connection) -> rusqlite::Result<BulkCompactionReport> {
    let rows = streaming_candidates(conn)?;
    let mut report = BulkCompactionReport {
        scanned: rows.len(),
        ..Default::default()
    };

    if rows.is_empty() {
        info!(migration = ID, "no streaming responses found to compact");
        return Ok(report);
    }
    info!(migration = ID, rows = rows.len(), "found streaming responses to compact");

    let tx = conn.unchecked_transaction()?;
    for (id, body) in &rows {
        let Some(compaction) = compact(body) else {
            continue;
        };
        if compaction.body == *body {
            continue;
        }
        update_response_body(&tx, *id, &compaction.body)?;
        report.stats.absorb(compaction.stats);
        report.rewritten += 1;
    }
    tx.commit()?;

    if report.rewritten == 0 {
        info!(migration = ID, "no responses needed compaction");
        return Ok(report);
    }

    info!(
        migration = ID,
        rewritten = report.rewritten,
        "compacted responses: {}",
        report.stats
    );
    info!(migration = ID, "running VACUUM to reclaim disk space");
    vacuum(conn)?;
    info!(migration = ID, "VACUUM complete");

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = "event: message_start\n\
        data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"role\":\"assistant\"}}\n\n\
        event: content_block_delta\n\
        data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"hello\"}}\n\n";

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE request_logs (id INTEGER PRIMARY KEY, response_body TEXT);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_rewrites_streams_and_leaves_others() {
        let conn = setup();
        conn.execute(
            "INSERT INTO request_logs (response_body) VALUES (?1), ('{\"plain\":true}'), ('event: ping\ndata: [DONE]\n')",
            [STREAM],
        )
        .unwrap();

        let report = compact_stored_responses(&conn).unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.rewritten, 1);
        assert!(report.stats.saved_bytes() > 0);

        let body: String = conn
            .query_row("SELECT response_body FROM request_logs WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["id"], "msg_1");
        assert_eq!(value["content"][0]["text"], "hello");

        let untouched: String = conn
            .query_row("SELECT response_body FROM request_logs WHERE id = 3", [], |row| row.get(0))
            .unwrap();
        assert_eq!(untouched, "event: ping\ndata: [DONE]\n");
    }

    #[test]
    fn test_empty_table() {
        let conn = setup();
        let report = compact_stored_responses(&conn).unwrap();
        assert_eq!(report, BulkCompactionReport::default());
    }
}
