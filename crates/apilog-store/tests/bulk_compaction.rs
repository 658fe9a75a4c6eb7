use apilog_store::{compact_stored_responses, NewRequestLog, RequestLogDb};
use chrono::Utc;
use std::collections::BTreeMap;

fn stream_body(text: &str) -> String {
    format!(
        "event: message_start\n\
         data: {{\"type\":\"message_start\",\"message\":{{\"id\":\"msg_{text}\",\"role\":\"assistant\",\"usage\":{{\"input_tokens\":3}}}}}}\n\n\
         event: content_block_delta\n\
         data: {{\"type\":\"content_block_delta\",\"delta\":{{\"type\":\"text_delta\",\"text\":\"{text}\"}}}}\n\n\
         event: message_delta\n\
         data: {{\"type\":\"message_delta\",\"delta\":{{\"stop_reason\":\"end_turn\"}},\"usage\":{{\"output_tokens\":1}}}}\n\n\
         event: message_stop\n\
         data: {{\"type\":\"message_stop\"}}\n\n"
    )
}

fn entry(body: &str) -> NewRequestLog {
    NewRequestLog {
        timestamp: Utc::now(),
        method: "POST".to_string(),
        path: "/v1/messages".to_string(),
        target_url: "https://api.example.com/v1/messages".to_string(),
        request_headers: BTreeMap::new(),
        request_body: None,
        response_status: Some(200),
        response_headers: BTreeMap::new(),
        response_body: Some(body.to_string()),
        duration_ms: 5,
    }
}

#[test]
fn test_bulk_compaction_is_reentrant() {
    let temp = tempfile::TempDir::new().unwrap();
    let db = RequestLogDb::open(&temp.path().join("requests.db")).unwrap();

    let first = db.insert(&entry(&stream_body("alpha"))).unwrap();
    let second = db.insert(&entry(&stream_body("beta"))).unwrap();
    let plain = db.insert(&entry("{\"id\":\"msg_plain\"}")).unwrap();

    let report = compact_stored_responses(db.connection()).unwrap();
    assert_eq!(report.scanned, 2);
    assert_eq!(report.rewritten, 2);
    assert!(report.stats.compacted_bytes < report.stats.original_bytes);

    let again = compact_stored_responses(db.connection()).unwrap();
    assert_eq!(again.scanned, 0);
    assert_eq!(again.rewritten, 0);

    let row = db.get(first).unwrap().unwrap();
    let body: serde_json::Value = serde_json::from_str(row.response_body.as_deref().unwrap()).unwrap();
    assert_eq!(body["id"], "msg_alpha");
    assert_eq!(body["stop_reason"], "end_turn");
    assert_eq!(body["content"][0]["text"], "alpha");
    assert_eq!(body["usage"]["input_tokens"], 3);
    assert_eq!(body["usage"]["output_tokens"], 1);
    assert_eq!(body["_compacted"]["original_chunks"], 4);

    let row = db.get(second).unwrap().unwrap();
    assert!(row.response_body.unwrap().contains("\"beta\""));

    let row = db.get(plain).unwrap().unwrap();
    assert_eq!(row.response_body.as_deref(), Some("{\"id\":\"msg_plain\"}"));

    // Only the body column changes
    let row = db.get(first).unwrap().unwrap();
    assert_eq!(row.method, "POST");
    assert_eq!(row.response_status, Some(200));
}
