//! Mediashare Node - stores media files and serves them through access links

use clap::Parser;
use mediashare_node::{run_server_with_shutdown, NodeConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mediashare-node")]
#[command(about = "Mediashare storage node")]
#[command(version)]
struct Args {
    /// Node id registered at the gateway
    #[arg(long, env = "MEDIASHARE_NODE_ID")]
    node_id: String,

    /// Pre-shared node secret
    #[arg(long, env = "MEDIASHARE_NODE_SECRET", hide_env_values = true)]
    secret: String,

    /// Gateway base URL
    #[arg(long, default_value = "http://localhost:8080", env = "MEDIASHARE_GATEWAY_URL")]
    gateway_url: String,

    /// Root directory of the file store
    #[arg(long, default_value = "data", env = "MEDIASHARE_NODE_BASE_DIR")]
    base_dir: PathBuf,

    /// Directory watched by the reverse proxy
    #[arg(long, default_value = "rules", env = "MEDIASHARE_NODE_RULES_DIR")]
    rules_dir: PathBuf,

    /// Reverse proxy service that serves the file store
    #[arg(long, default_value = "mediashare-files", env = "MEDIASHARE_NODE_PROXY_SERVICE")]
    proxy_service: String,

    /// Group folder to provision (repeatable)
    #[arg(long = "group", env = "MEDIASHARE_NODE_GROUPS", value_delimiter = ',')]
    groups: Vec<String>,

    /// User session lifetime (seconds)
    #[arg(long, default_value = "86400", env = "MEDIASHARE_NODE_SESSION_TTL")]
    session_ttl: u64,

    /// Delay between gateway registration attempts (seconds)
    #[arg(long, default_value = "10", env = "MEDIASHARE_NODE_RETRY_INTERVAL")]
    retry_interval: u64,

    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "MEDIASHARE_NODE_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8081", env = "MEDIASHARE_NODE_PORT")]
    port: u16,

    /// Enable debug logging
    #[arg(short, long, env = "MEDIASHARE_DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("mediashare_node={log_level},mediashare_client={log_level},tower_http=debug").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        node_id = %args.node_id,
        "Starting Mediashare node on {}:{}",
        args.host,
        args.port
    );

    let config = NodeConfig {
        node_id: args.node_id,
        secret: args.secret,
        gateway_url: args.gateway_url,
        base_dir: args.base_dir,
        rules_dir: args.rules_dir,
        proxy_service: args.proxy_service,
        groups: args.groups,
        session_ttl_secs: args.session_ttl,
        retry_interval_secs: args.retry_interval,
        host: args.host,
        port: args.port,
        ..Default::default()
    };

    run_server_with_shutdown(config, async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await
}
