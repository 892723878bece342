//! Node self-registration with the gateway

use mediashare_client::GatewayClient;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Present the node secret to the gateway until it is accepted.
///
/// Retries on a fixed delay with no attempt limit. Returns the number of
/// attempts made.
pub async fn register_with_gateway(
    client: &GatewayClient,
    node_id: &str,
    secret: &str,
    retry_interval: Duration,
) -> u32 {
    let endpoint = client.authenticate_url(node_id);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match client.authenticate_node(node_id, secret).await {
            Ok(()) => {
                info!(node_id, endpoint = %endpoint, attempt, "Registered with gateway");
                return attempt;
            }
            Err(e) => {
                warn!(
                    node_id,
                    endpoint = %endpoint,
                    status = ?e.status(),
                    attempt,
                    error = %e,
                    "Gateway registration failed, retrying in {:?}",
                    retry_interval
                );
            }
        }
        tokio::time::sleep(retry_interval).await;
    }
}

/// Run [`register_with_gateway`] in the background
pub fn spawn_registration(
    client: GatewayClient,
    node_id: String,
    secret: String,
    retry_interval: Duration,
) -> JoinHandle<u32> {
    tokio::spawn(async move {
        register_with_gateway(&client, &node_id, &secret, retry_interval).await
    })
}
