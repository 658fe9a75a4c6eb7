use crate::config::ProxyConfig;
use crate::headers::{forward_request_headers, forward_response_headers, headers_for_log};
use crate::logger::{decode_body, RequestLogger};
use apilog_store::NewRequestLog;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Shared by every request handler
#[derive(Clone)]
pub struct AppState {
    client: reqwest::Client,
    target_base: Arc<str>,
    logger: RequestLogger,
}

impl AppState {
    pub fn new(config: &ProxyConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.upstream_timeout)
            .build()?;
        Ok(Self {
            client,
            target_base: Arc::from(config.target_base()),
            logger: RequestLogger::new(config.db_path.clone()),
        })
    }
}

pub(crate) async fn health() -> &'static str {
    "OK"
}

/// Forward the call unchanged, answer the client, and log the exchange in the background
pub(crate) async fn proxy(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .to_string();
    let target_url = format!("{}{}", state.target_base, path);
    let forward_headers = forward_request_headers(&headers);

    let mut entry = NewRequestLog {
        timestamp: Utc::now(),
        method: method.to_string(),
        path,
        target_url: target_url.clone(),
        request_headers: headers_for_log(&forward_headers),
        request_body: (!body.is_empty()).then(|| decode_body(&body)),
        response_status: None,
        response_headers: BTreeMap::new(),
        response_body: None,
        duration_ms: 0,
    };

    let mut request = state
        .client
        .request(method, &target_url)
        .headers(forward_headers);
    if !body.is_empty() {
        request = request.body(body);
    }

    let reply = match exchange(request).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(method = %entry.method, path = %entry.path, error = %e, "error proxying request");
            entry.duration_ms = started.elapsed().as_millis() as i64;
            return fail(&state, entry, &e, &[]);
        }
    };

    let response_headers = forward_response_headers(&reply.headers);
    entry.duration_ms = started.elapsed().as_millis() as i64;
    entry.response_status = Some(reply.status.as_u16());
    entry.response_headers = headers_for_log(&response_headers);

    if let Some(e) = reply.interrupted {
        error!(
            method = %entry.method,
            path = %entry.path,
            status = reply.status.as_u16(),
            received = reply.body.len(),
            error = %e,
            "upstream response body interrupted"
        );
        return fail(&state, entry, &e, &reply.body);
    }

    entry.response_body = Some(decode_body(&reply.body));
    info!(
        "{} {} -> {} ({}ms)",
        entry.method,
        entry.path,
        reply.status.as_u16(),
        entry.duration_ms
    );
    state.logger.spawn_record(entry);

    let mut response = Response::new(Body::from(reply.body));
    *response.status_mut() = reply.status;
    *response.headers_mut() = response_headers;
    response
}

/// Log what was received before `error`, then answer the client with 500
fn fail(
    state: &AppState,
    mut entry: NewRequestLog,
    error: &reqwest::Error,
    received: &[u8],
) -> Response {
    let message = format!("Proxy error: {}", error);
    entry.response_body = Some(partial_body(received, &message));
    state.logger.spawn_record(entry);
    (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
}

/// Received bytes followed by the error line; an event stream stays
/// recognizable so it is still compacted
fn partial_body(received: &[u8], message: &str) -> String {
    if received.is_empty() {
        return message.to_string();
    }
    format!("{}\n{}", decode_body(received), message)
}

/// Upstream status and headers plus as much of the body as arrived
struct UpstreamReply {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    /// Set when the body stopped before it was complete
    interrupted: Option<reqwest::Error>,
}

async fn exchange(request: reqwest::RequestBuilder) -> Result<UpstreamReply, reqwest::Error> {
    let mut response = request.send().await?;
    let status = response.status();
    let headers = response.headers().clone();

    let mut body = Vec::new();
    let interrupted = loop {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) => break None,
            Err(e) => break Some(e),
        }
    };

    Ok(UpstreamReply {
        status,
        headers,
        body: Bytes::from(body),
        interrupted,
    })
}
