//! Mediashare Gateway - sessions, node trust, and media metadata

use clap::Parser;
use mediashare_gateway::{run_server_with_shutdown, GatewayConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mediashare-gateway")]
#[command(about = "Gateway for Mediashare storage nodes")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "MEDIASHARE_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "MEDIASHARE_PORT")]
    port: u16,

    /// JSON seed with group memberships and nodes
    #[arg(long, env = "MEDIASHARE_SEED")]
    seed: Option<PathBuf>,

    /// Timeout of gateway-to-node calls (seconds)
    #[arg(long, default_value = "5", env = "MEDIASHARE_NODE_TIMEOUT")]
    node_timeout: u64,

    /// Timeout of metadata store calls (seconds)
    #[arg(long, default_value = "30", env = "MEDIASHARE_STORE_TIMEOUT")]
    store_timeout: u64,

    /// Rate limit (requests per second per user)
    #[arg(long, default_value = "100", env = "MEDIASHARE_RATE_LIMIT")]
    rate_limit: u32,

    /// Enable debug logging
    #[arg(short, long, env = "MEDIASHARE_DEBUG")]
    debug: bool,

    /// JWT secret for token validation
    #[arg(long, env = "JWT_SECRET")]
    jwt_secret: Option<String>,

    /// Disable authentication; bearer tokens are taken as usernames (development only!)
    #[arg(long, env = "MEDIASHARE_NO_AUTH")]
    no_auth: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("mediashare_gateway={log_level},mediashare_client={log_level},tower_http=debug").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Mediashare gateway on {}:{}", args.host, args.port);

    if args.no_auth {
        tracing::warn!("Authentication is DISABLED - for development only!");
    }

    let config = GatewayConfig {
        host: args.host,
        port: args.port,
        jwt_secret: args.jwt_secret,
        auth_enabled: !args.no_auth,
        node_timeout_secs: args.node_timeout,
        store_timeout_secs: args.store_timeout,
        rate_limit_rps: args.rate_limit,
        seed_path: args.seed,
        ..Default::default()
    };

    run_server_with_shutdown(config, async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await
}
