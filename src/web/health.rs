//! Health endpoint polled by the hosting platform.

use std::net::SocketAddr;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use crate::web::wait_for_shutdown;

pub const ALIVE_BODY: &str = "Bot is Alive!";

pub fn router() -> Router {
    Router::new().route("/", get(alive))
}

async fn alive() -> &'static str {
    ALIVE_BODY
}

/// Serve `GET /` on `0.0.0.0:port` until shutdown.
pub async fn serve(port: u16, mut shutdown_rx: watch::Receiver<bool>) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding health server on {}", addr))?;
    info!("Web server running on port {}", port);

    axum::serve(listener, router())
        .with_graceful_shutdown(async move { wait_for_shutdown(&mut shutdown_rx).await })
        .await
        .context("serving health endpoint")?;

    info!("Web server stopped");
    Ok(())
}
