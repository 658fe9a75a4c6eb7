//! Migration units and their failure modes

use rusqlite::Connection;
use thiserror::Error;

pub type RoutineError = Box<dyn std::error::Error + Send + Sync>;

/// Data-rewriting body of a procedural migration.
///
/// Gets the raw connection and owns its own transactions, so it can run
/// statements such as VACUUM that SQLite refuses inside one.
pub type Routine = fn(&Connection) -> Result<(), RoutineError>;

#[derive(Debug, Clone, Copy)]
pub enum MigrationKind {
    /// Idempotent schema statements executed as one batch
    Structural { statements: &'static str },
    /// Arbitrary routine; `None` is skipped and retried on the next run
    Procedural { routine: Option<Routine> },
}

/// One versioned step, identified by a numeric-prefixed name such as `000_initial`
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub id: &'static str,
    pub kind: MigrationKind,
}

impl Migration {
    pub const fn structural(id: &'static str, statements: &'static str) -> Self {
        Self {
            id,
            kind: MigrationKind::Structural { statements },
        }
    }

    pub const fn procedural(id: &'static str, routine: Routine) -> Self {
        Self {
            id,
            kind: MigrationKind::Procedural {
                routine: Some(routine),
            },
        }
    }

    /// A procedural unit whose routine hasn't landed yet
    pub const fn pending(id: &'static str) -> Self {
        Self {
            id,
            kind: MigrationKind::Procedural { routine: None },
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            MigrationKind::Structural { .. } => "structural",
            MigrationKind::Procedural { .. } => "procedural",
        }
    }
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("duplicate migration identifier: {0}")]
    DuplicateId(String),

    #[error("migration {id} failed: {source}")]
    Failed {
        id: String,
        #[source]
        source: RoutineError,
    },
}

impl MigrationError {
    pub(crate) fn failed(id: &str, source: impl Into<RoutineError>) -> Self {
        Self::Failed {
            id: id.to_string(),
            source: source.into(),
        }
    }

    /// Identifier of the unit that failed, if the failure came from a unit body
    pub fn migration_id(&self) -> Option<&str> {
        match self {
            Self::Failed { id, .. } => Some(id),
            _ => None,
        }
    }
}
