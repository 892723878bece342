//! Server startup and lifecycle

use crate::{routes, AppState, GatewayConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Run the gateway server
pub async fn run_server(config: GatewayConfig) -> anyhow::Result<()> {
    run_server_with_shutdown(config, std::future::pending()).await
}

/// Run server with graceful shutdown
pub async fn run_server_with_shutdown(
    config: GatewayConfig,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(config.clone()).await?);
    let listener = TcpListener::bind(config.bind_addr()).await?;
    serve(listener, state, shutdown_signal).await
}

/// Serve an already built state on a bound listener
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = routes::create_router(state);

    info!("Mediashare gateway listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Gateway shutdown complete");

    Ok(())
}
