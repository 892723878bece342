//! Server startup and lifecycle

use crate::registration::spawn_registration;
use crate::{routes, NodeConfig, NodeState};
use mediashare_client::{ClientConfig, GatewayClient};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Run the node server
pub async fn run_server(config: NodeConfig) -> anyhow::Result<()> {
    run_server_with_shutdown(config, std::future::pending()).await
}

/// Run server with graceful shutdown.
///
/// Prepares the storage areas, starts registering with the gateway in the
/// background and serves requests meanwhile.
pub async fn run_server_with_shutdown(
    config: NodeConfig,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    if config.secret.is_empty() {
        anyhow::bail!("node secret not configured");
    }

    let state = Arc::new(NodeState::new(config.clone()));
    state.files.init(&config.groups).await?;
    tokio::fs::create_dir_all(&config.rules_dir).await?;

    let gateway = GatewayClient::new(
        &config.gateway_url,
        ClientConfig::default().with_timeout(config.gateway_timeout()),
    )?;
    let registration = spawn_registration(
        gateway,
        config.node_id.clone(),
        config.secret.clone(),
        config.retry_interval(),
    );

    let listener = TcpListener::bind(config.bind_addr()).await?;
    let result = serve(listener, state, shutdown_signal).await;
    registration.abort();
    result
}

/// Serve an already built state on a bound listener
pub async fn serve(
    listener: TcpListener,
    state: Arc<NodeState>,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let node_id = state.config.node_id.clone();
    let app = routes::create_router(state);

    info!(node_id = %node_id, "Mediashare node listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!(node_id = %node_id, "Node shutdown complete");

    Ok(())
}
