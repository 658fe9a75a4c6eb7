use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One proxied call, as handed over by the forwarding layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRequestLog {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub target_url: String,
    pub request_headers: BTreeMap<String, String>,
    pub request_body: Option<String>,
    /// `None` when the upstream was never reached
    pub response_status: Option<u16>,
    pub response_headers: BTreeMap<String, String>,
    pub response_body: Option<String>,
    pub duration_ms: i64,
}

impl NewRequestLog {
    /// Request body as stored: JSON bodies re-serialized, anything else
    /// wrapped as `{"raw": ...}`, empty bodies as NULL
    pub fn request_body_json(&self) -> Option<String> {
        let body = self.request_body.as_deref().filter(|b| !b.is_empty())?;
        let value = serde_json::from_str::<Value>(body)
            .unwrap_or_else(|_| serde_json::json!({ "raw": body }));
        Some(value.to_string())
    }
}

/// A persisted row of `request_logs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLog {
    pub id: i64,
    pub timestamp: String,
    pub method: String,
    pub path: String,
    pub target_url: String,
    pub request_headers: Value,
    pub request_body: Option<Value>,
    pub response_status: Option<i64>,
    pub response_headers: Value,
    pub response_body: Option<String>,
    pub duration_ms: Option<i64>,
    pub created_at: Option<String>,
}
