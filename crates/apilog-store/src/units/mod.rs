//! Procedural migration bodies

pub mod backfill_target_url;
pub mod compact_streaming;
