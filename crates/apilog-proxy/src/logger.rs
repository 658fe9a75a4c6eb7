//! Writes one row per proxied call, compacting event streams first

use apilog_store::{NewRequestLog, RequestLogDb};
use apilog_stream::compact;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

#[derive(Debug, Clone)]
pub struct RequestLogger {
    db_path: Arc<PathBuf>,
}

impl RequestLogger {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Arc::new(db_path.into()),
        }
    }

    /// Compact the response body if it is an event stream, then insert the row.
    /// Blocking; opens its own connection.
    pub fn record(&self, mut entry: NewRequestLog) -> anyhow::Result<i64> {
        if let Some(compaction) = entry.response_body.as_deref().and_then(compact) {
            debug!(
                path = %entry.path,
                chunks = compaction.record.audit.original_chunks,
                "compacted streaming response: {}",
                compaction.stats
            );
            entry.response_body = Some(compaction.body);
        }

        let db = RequestLogDb::connect(&self.db_path)?;
        db.insert(&entry)
    }

    /// Run [`RequestLogger::record`] off the async runtime. Failures are
    /// reported through tracing; the handle resolves once the write finished.
    pub fn spawn_record(&self, entry: NewRequestLog) -> JoinHandle<()> {
        let logger = self.clone();
        tokio::task::spawn_blocking(move || {
            let method = entry.method.clone();
            let path = entry.path.clone();
            if let Err(e) = logger.record(entry) {
                error!(
                    error = %e,
                    db = %logger.db_path.display(),
                    %method,
                    %path,
                    "failed to log request"
                );
            }
        })
    }
}

/// Body bytes as text, or a placeholder when they aren't UTF-8
pub fn decode_body(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary data, {} bytes>", bytes.len()),
    }
}
