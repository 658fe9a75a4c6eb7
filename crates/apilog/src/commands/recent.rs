use anyhow::Context;
use apilog_store::{RequestLog, RequestLogDb};
use apilog_stream::format_bytes;
use std::path::Path;

pub fn run(db_path: &Path, limit: usize) -> anyhow::Result<()> {
    let db = RequestLogDb::open_read_only(db_path)
        .with_context(|| format!("cannot read request log {}", db_path.display()))?;

    let rows = db.recent(limit)?;
    if rows.is_empty() {
        println!("No requests logged yet");
        return Ok(());
    }
    for row in &rows {
        println!("{}", summary_line(row));
    }
    Ok(())
}

fn summary_line(row: &RequestLog) -> String {
    let status = row
        .response_status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "---".to_string());
    let size = row
        .response_body
        .as_ref()
        .map(|b| format_bytes(b.len() as i64))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:>6}  {}  {:<7} {:<40} {}  {:>6}ms  {}",
        row.id,
        row.timestamp,
        row.method,
        row.path,
        status,
        row.duration_ms.unwrap_or(0),
        size
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use apilog_store::NewRequestLog;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn entry(status: Option<u16>) -> NewRequestLog {
        NewRequestLog {
            timestamp: Utc::now(),
            method: "GET".to_string(),
            path: "/v1/models".to_string(),
            target_url: "https://api.example.com/v1/models".to_string(),
            request_headers: BTreeMap::new(),
            request_body: None,
            response_status: status,
            response_headers: BTreeMap::new(),
            response_body: Some("{}".to_string()),
            duration_ms: 7,
        }
    }

    #[test]
    fn test_summary_line_shows_status_and_size() {
        let db = RequestLogDb::open_in_memory().unwrap();
        let id = db.insert(&entry(Some(200))).unwrap();
        let line = summary_line(&db.get(id).unwrap().unwrap());
        assert!(line.contains("/v1/models"));
        assert!(line.contains("200"));
        assert!(line.contains("2.00 B"));
    }

    #[test]
    fn test_summary_line_failed_exchange() {
        let db = RequestLogDb::open_in_memory().unwrap();
        let id = db.insert(&entry(None)).unwrap();
        let line = summary_line(&db.get(id).unwrap().unwrap());
        assert!(line.contains("---"));
    }

    #[test]
    fn test_run_does_not_create_or_migrate() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("requests.db");
        assert!(run(&db_path, 5).is_err());
        assert!(!db_path.exists());

        RequestLogDb::open(&db_path).unwrap().insert(&entry(Some(200))).unwrap();
        assert!(run(&db_path, 5).is_ok());
    }
}
