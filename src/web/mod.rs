//! HTTP surfaces: the health endpoint, the self-ping loop and joke fetching.

pub mod health;
pub mod joke;
pub mod keepalive;

pub use joke::JokeClient;

use tokio::sync::watch;

/// Resolve once the shutdown flag flips to `true` or its sender is gone.
pub async fn wait_for_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    while !*shutdown_rx.borrow() {
        if shutdown_rx.changed().await.is_err() {
            break;
        }
    }
}

/// Serve `router` on an ephemeral loopback port for the rest of the test.
#[cfg(test)]
pub(crate) async fn serve_test_router(router: axum::Router) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}
