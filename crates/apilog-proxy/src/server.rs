use crate::config::ProxyConfig;
use crate::handler::{health, proxy, AppState};
use axum::extract::DefaultBodyLimit;
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

/// `/health` plus a catch-all that proxies everything else.
/// Request bodies of any size are forwarded.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", any(health))
        .fallback(proxy)
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

pub async fn serve(config: ProxyConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.addr()).await?;
    serve_on(listener, config).await
}

/// Serve on an already bound listener until ctrl-c
pub async fn serve_on(listener: TcpListener, config: ProxyConfig) -> anyhow::Result<()> {
    let state = AppState::new(&config)?;
    info!(
        addr = %listener.local_addr()?,
        target = %config.target_base(),
        db = %config.db_path.display(),
        "proxy listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
