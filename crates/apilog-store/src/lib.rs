//! SQLite request log store and its self-applying migrations

mod migration;
mod registry;
mod runner;
mod storage;
mod types;
pub mod units;

pub use migration::{Migration, MigrationError, MigrationKind, Routine, RoutineError};
pub use registry::{MIGRATIONS, INITIAL_MIGRATION, REQUEST_LOG_TABLE};
pub use runner::{Baseline, MigrationReport, MigrationRunner, MigrationStatus};
pub use storage::RequestLogDb;
pub use types::{NewRequestLog, RequestLog};
pub use units::compact_streaming::{compact_stored_responses, BulkCompactionReport};
