//! Adds `target_url` to request log tables created before the column existed

use crate::migration::RoutineError;
use rusqlite::Connection;
use tracing::info;

pub const ID: &str = "002_backfill_target_url";

pub(crate) fn migrate(conn: &Connection) -> Result<(), RoutineError> {
    let has_column: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM pragma_table_info('request_logs') WHERE name = 'target_url'",
        [],
        |row| row.get(0),
    )?;

    if !has_column {
        conn.execute(
            "ALTER TABLE request_logs ADD COLUMN target_url TEXT DEFAULT ''",
            [],
        )?;
        info!(migration = ID, "added target_url column to request_logs");
    }
    Ok(())
}
