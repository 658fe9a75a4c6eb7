//! Applies migration units in identifier order and records what ran

use crate::migration::{Migration, MigrationError, MigrationKind};
use crate::registry::{INITIAL_MIGRATION, REQUEST_LOG_TABLE};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info, warn};

/// A unit that may be marked applied without running, when the table it
/// creates already exists in a store that predates migration tracking
#[derive(Debug, Clone, Copy)]
pub struct Baseline {
    pub migration_id: &'static str,
    pub table: &'static str,
}

impl Default for Baseline {
    fn default() -> Self {
        Self {
            migration_id: INITIAL_MIGRATION,
            table: REQUEST_LOG_TABLE,
        }
    }
}

/// What one run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Units executed and recorded, in execution order
    pub applied: Vec<String>,
    /// Units recorded without executing (pre-existing table)
    pub baselined: Vec<String>,
    /// Procedural units with no routine; left unrecorded
    pub skipped: Vec<String>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty() && self.baselined.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub id: String,
    pub kind: &'static str,
    pub applied_at: Option<String>,
}

pub struct MigrationRunner<'a> {
    conn: &'a mut Connection,
    baseline: Option<Baseline>,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        Self {
            conn,
            baseline: Some(Baseline::default()),
        }
    }

    pub fn with_baseline(mut self, baseline: Option<Baseline>) -> Self {
        self.baseline = baseline;
        self
    }

    /// Run every unapplied unit, one at a time, in ascending identifier order.
    ///
    /// Stops at the first failing unit; that unit and everything after it
    /// stay unrecorded.
    pub fn run(&mut self, migrations: &[Migration]) -> Result<MigrationReport, MigrationError> {
        ensure_tracking_table(self.conn)?;
        let ordered = ordered(migrations)?;
        let mut applied: HashSet<String> = applied_at(self.conn)?.into_keys().collect();
        let mut report = MigrationReport::default();

        if let Some(baseline) = self.baseline {
            let known = ordered.iter().any(|m| m.id == baseline.migration_id);
            if known
                && !applied.contains(baseline.migration_id)
                && table_exists(self.conn, baseline.table)?
            {
                record_applied(self.conn, baseline.migration_id)?;
                info!(
                    migration = baseline.migration_id,
                    table = baseline.table,
                    "table predates migration tracking, marking applied without running"
                );
                applied.insert(baseline.migration_id.to_string());
                report.baselined.push(baseline.migration_id.to_string());
            }
        }

        for migration in ordered {
            if applied.contains(migration.id) {
                debug!(migration = migration.id, "already applied");
                continue;
            }

            match migration.kind {
                MigrationKind::Structural { statements } => {
                    info!(migration = migration.id, "applying structural migration");
                    let tx = self.conn.transaction()?;
                    if let Err(e) = tx.execute_batch(statements) {
                        error!(migration = migration.id, error = %e, "migration failed");
                        return Err(MigrationError::failed(migration.id, e));
                    }
                    record_applied(&tx, migration.id)?;
                    tx.commit()?;
                }
                MigrationKind::Procedural { routine: None } => {
                    warn!(
                        migration = migration.id,
                        "procedural migration has no routine, skipping"
                    );
                    report.skipped.push(migration.id.to_string());
                    continue;
                }
                MigrationKind::Procedural {
                    routine: Some(routine),
                } => {
                    info!(migration = migration.id, "applying procedural migration");
                    if let Err(e) = routine(self.conn) {
                        error!(migration = migration.id, error = %e, "migration failed");
                        return Err(MigrationError::failed(migration.id, e));
                    }
                    record_applied(self.conn, migration.id)?;
                }
            }

            info!(migration = migration.id, "migration applied");
            applied.insert(migration.id.to_string());
            report.applied.push(migration.id.to_string());
        }

        Ok(report)
    }

    /// Every known unit with its applied-at time, without running anything
    pub fn status(&mut self, migrations: &[Migration]) -> Result<Vec<MigrationStatus>, MigrationError> {
        ensure_tracking_table(self.conn)?;
        let mut applied = applied_at(self.conn)?;
        Ok(ordered(migrations)?
            .into_iter()
            .map(|m| MigrationStatus {
                id: m.id.to_string(),
                kind: m.kind_name(),
                applied_at: applied.remove(m.id),
            })
            .collect())
    }
}

fn ensure_tracking_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            filename TEXT PRIMARY KEY,
            applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
}

fn ordered(migrations: &[Migration]) -> Result<Vec<&Migration>, MigrationError> {
    let mut ordered: Vec<&Migration> = migrations.iter().collect();
    ordered.sort_by_key(|m| m.id);
    if let Some(pair) = ordered.windows(2).find(|pair| pair[0].id == pair[1].id) {
        return Err(MigrationError::DuplicateId(pair[0].id.to_string()));
    }
    Ok(ordered)
}

/// Applied identifiers mapped to when they were applied.
///
/// Earlier releases recorded file names (`001_x.sql`, `003_y.py`); those
/// count as the bare identifier.
fn applied_at(conn: &Connection) -> rusqlite::Result<HashMap<String, String>> {
    let mut stmt = conn.prepare("SELECT filename, COALESCE(applied_at, '') FROM schema_migrations")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut applied = HashMap::new();
    for row in rows {
        let (filename, at) = row?;
        applied.insert(strip_legacy_extension(&filename).to_string(), at);
    }
    Ok(applied)
}

fn strip_legacy_extension(filename: &str) -> &str {
    filename
        .strip_suffix(".sql")
        .or_else(|| filename.strip_suffix(".py"))
        .unwrap_or(filename)
}

fn record_applied(conn: &Connection, id: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (filename, applied_at) VALUES (?1, ?2)",
        params![id, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )
}
