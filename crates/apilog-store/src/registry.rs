//! Every migration this build knows about, in application order

use crate::migration::Migration;
use crate::units::{backfill_target_url, compact_streaming};

/// Identifier of the unit that creates the request log table
pub const INITIAL_MIGRATION: &str = "000_initial";

pub const REQUEST_LOG_TABLE: &str = "request_logs";

pub static MIGRATIONS: &[Migration] = &[
    Migration::structural(INITIAL_MIGRATION, include_str!("../migrations/000_initial.sql")),
    Migration::structural(
        "001_request_log_indexes",
        include_str!("../migrations/001_request_log_indexes.sql"),
    ),
    Migration::procedural(backfill_target_url::ID, backfill_target_url::migrate),
    Migration::procedural(compact_streaming::ID, compact_streaming::migrate),
];
