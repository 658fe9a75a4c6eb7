//! Logging reverse proxy: forwards calls upstream and records each exchange

mod config;
mod handler;
mod headers;
mod logger;
mod server;

pub use config::{
    ProxyConfig, DEFAULT_DB_PATH, DEFAULT_PORT, DEFAULT_TARGET_URL, DEFAULT_UPSTREAM_TIMEOUT_SECS,
};
pub use handler::AppState;
pub use headers::{forward_request_headers, forward_response_headers, headers_for_log};
pub use logger::{decode_body, RequestLogger};
pub use server::{router, serve, serve_on};
