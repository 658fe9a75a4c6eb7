//! Hop-by-hop header filtering

use axum::http::HeaderMap;
use std::collections::BTreeMap;

const REQUEST_HOP_BY_HOP: &[&str] = &["host", "connection", "keep-alive", "transfer-encoding"];

const RESPONSE_HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "transfer-encoding",
    "upgrade",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
];

/// Headers from the client that are passed on upstream
pub fn forward_request_headers(headers: &HeaderMap) -> HeaderMap {
    without(headers, REQUEST_HOP_BY_HOP)
}

/// Headers from the upstream that are passed back to the client
pub fn forward_response_headers(headers: &HeaderMap) -> HeaderMap {
    without(headers, RESPONSE_HOP_BY_HOP)
}

/// Flatten headers for storage; repeated names keep the last value
pub fn headers_for_log(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

fn without(headers: &HeaderMap, drop: &[&str]) -> HeaderMap {
    let mut kept = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        // HeaderName is always lowercase
        if !drop.contains(&name.as_str()) {
            kept.append(name.clone(), value.clone());
        }
    }
    kept
}
