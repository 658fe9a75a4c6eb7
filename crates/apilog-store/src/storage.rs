use crate::migration::MigrationError;
use crate::registry::{MIGRATIONS, REQUEST_LOG_TABLE};
use crate::runner::{table_exists, MigrationReport, MigrationRunner, MigrationStatus};
use crate::types::{NewRequestLog, RequestLog};
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str = "SELECT id, timestamp, method, path, target_url, request_headers,
        request_body, response_status, response_headers, response_body, duration_ms, created_at
     FROM request_logs";

pub struct RequestLogDb {
    conn: Connection,
}

impl RequestLogDb {
    /// Open (creating if needed) the database and bring it up to date
    pub fn open(db_path: &Path) -> Result<Self> {
        let mut db = Self::connect(db_path)?;
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open without running migrations; for writers that start after startup
    pub fn connect(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self { conn })
    }

    /// Open an existing, already migrated database for reading only
    pub fn open_read_only(db_path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("cannot open {}", db_path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        if !table_exists(&conn, REQUEST_LOG_TABLE)? {
            bail!(
                "{} has no {} table; run migrations first",
                db_path.display(),
                REQUEST_LOG_TABLE
            );
        }
        Ok(Self { conn })
    }

    pub fn migrate(&mut self) -> Result<MigrationReport, MigrationError> {
        MigrationRunner::new(&mut self.conn).run(MIGRATIONS)
    }

    pub fn migration_status(&mut self) -> Result<Vec<MigrationStatus>, MigrationError> {
        MigrationRunner::new(&mut self.conn).status(MIGRATIONS)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Append one request/response pair; returns the new row id
    pub fn insert(&self, entry: &NewRequestLog) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO request_logs
             (timestamp, method, path, target_url, request_headers, request_body,
              response_status, response_headers, response_body, duration_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                entry.timestamp.to_rfc3339(),
                entry.method,
                entry.path,
                entry.target_url,
                serde_json::to_string(&entry.request_headers)?,
                entry.request_body_json(),
                entry.response_status.map(i64::from),
                serde_json::to_string(&entry.response_headers)?,
                entry.response_body,
                entry.duration_ms,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Rewrite the stored response body of one row. Returns false if the id is unknown.
    pub fn update_response_body(&self, id: i64, body: &str) -> Result<bool> {
        Ok(update_response_body(&self.conn, id, body)? > 0)
    }

    pub fn get(&self, id: i64) -> Result<Option<RequestLog>> {
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![id], row_to_log)
            .optional()?;
        Ok(row)
    }

    /// Most recent rows first
    pub fn recent(&self, limit: usize) -> Result<Vec<RequestLog>> {
        let sql = format!("{} ORDER BY id DESC LIMIT ?1", SELECT_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], row_to_log)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM request_logs", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn streaming_candidates(&self) -> Result<Vec<(i64, String)>> {
        Ok(streaming_candidates(&self.conn)?)
    }

    pub fn vacuum(&self) -> Result<()> {
        vacuum(&self.conn)?;
        Ok(())
    }
}

/// The only statement that mutates an existing row
pub(crate) fn update_response_body(conn: &Connection, id: i64, body: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE request_logs SET response_body = ?1 WHERE id = ?2",
        params![body, id],
    )
}

/// Rows whose response body opens with an event declaration
pub(crate) fn streaming_candidates(conn: &Connection) -> rusqlite::Result<Vec<(i64, String)>> {
    let mut stmt = conn.prepare(
        "SELECT id, response_body FROM request_logs
         WHERE ltrim(response_body, char(9, 10, 13, 32)) LIKE 'event:%'
         ORDER BY id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;
    rows.collect()
}

/// Reclaim free pages; must not run inside a transaction
pub(crate) fn vacuum(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("VACUUM")
}

fn row_to_log(row: &rusqlite::Row) -> rusqlite::Result<RequestLog> {
    Ok(RequestLog {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        method: row.get(2)?,
        path: row.get(3)?,
        target_url: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        request_headers: parse_json(row.get(5)?).unwrap_or(Value::Null),
        request_body: parse_json(row.get(6)?),
        response_status: row.get(7)?,
        response_headers: parse_json(row.get(8)?).unwrap_or(Value::Null),
        response_body: row.get(9)?,
        duration_ms: row.get(10)?,
        created_at: row.get(11)?,
    })
}

// Older rows may hold plain text in JSON columns; keep it as a string value
fn parse_json(raw: Option<String>) -> Option<Value> {
    raw.map(|text| serde_json::from_str(&text).unwrap_or(Value::String(text)))
}
