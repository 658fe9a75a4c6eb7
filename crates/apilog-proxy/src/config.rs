//! Proxy configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TARGET_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_DB_PATH: &str = "/data/requests.db";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Interface to listen on
    pub bind: IpAddr,

    pub port: u16,

    /// Base URL requests are forwarded to; the incoming path and query are appended
    pub target_url: String,

    /// SQLite database holding request logs
    pub db_path: PathBuf,

    /// Upper bound on one upstream exchange, streaming bodies included
    pub upstream_timeout: Duration,
}

impl ProxyConfig {
    pub fn new() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            target_url: DEFAULT_TARGET_URL.to_string(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Target URL without a trailing slash
    pub fn target_base(&self) -> &str {
        self.target_url.trim_end_matches('/')
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::new()
    }
}
