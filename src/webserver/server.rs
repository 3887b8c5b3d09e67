/// Axum webserver implementation
///
/// Server lifecycle: bind, serve, and graceful termination on the shutdown notifier
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::{
    config::WebserverConfig,
    logger::{self, LogTag},
    webserver::{routes, state::AppState},
};

/// Start the webserver
///
/// This function blocks until `shutdown` is notified or the server fails
pub async fn start_server(
    state: AppState,
    config: &WebserverConfig,
    shutdown: Arc<Notify>,
) -> Result<(), String> {
    let listener = bind_listener(config).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to read bound address: {}", e))?;

    logger::info(
        LogTag::Webserver,
        &format!("Admin API listening on http://{}/api", addr),
    );

    let shutdown_signal = async move {
        shutdown.notified().await;
        logger::debug(
            LogTag::Webserver,
            "Received shutdown signal, stopping webserver...",
        );
    };

    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    logger::debug(LogTag::Webserver, "Webserver stopped gracefully");
    Ok(())
}

/// Check that the configured address can be bound, releasing it again
pub async fn test_port_binding(config: &WebserverConfig) -> Result<(), String> {
    bind_listener(config).await.map(drop)
}

/// Build the Axum application with all routes and middleware
pub fn build_app(state: AppState) -> Router {
    routes::create_router(Arc::new(state)).layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}

async fn bind_listener(config: &WebserverConfig) -> Result<TcpListener, String> {
    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| format!("Invalid bind address '{}': {}", config.bind_address(), e))?;

    TcpListener::bind(&addr).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::AddrInUse => format!(
            "Failed to bind to {}: Address already in use (is another instance running?)",
            addr
        ),
        std::io::ErrorKind::PermissionDenied => format!(
            "Failed to bind to {}: Permission denied, use a port above 1024",
            addr
        ),
        _ => format!("Failed to bind to {}: {}", addr, e),
    })
}
