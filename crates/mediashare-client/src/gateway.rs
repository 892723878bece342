//! Node-to-gateway client

use crate::{ClientConfig, ClientError, Result};
use reqwest::Client;
use tracing::instrument;

/// Client a storage node uses to register itself with the gateway
#[derive(Clone)]
pub struct GatewayClient {
    base_url: String,
    http: Client,
}

impl GatewayClient {
    /// Create a client for the gateway at `base_url`
    pub fn new(base_url: impl AsRef<str>, config: ClientConfig) -> Result<Self> {
        let base_url = url::Url::parse(base_url.as_ref())
            .map_err(|e| ClientError::Config(format!("invalid gateway URL: {e}")))?;

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()?;

        Ok(Self {
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Endpoint the node presents its secret to
    pub fn authenticate_url(&self, node_id: &str) -> String {
        format!(
            "{}/node/{}/authenticate",
            self.base_url,
            urlencoding::encode(node_id)
        )
    }

    /// Prove the node's identity by presenting its pre-shared secret
    #[instrument(skip(self, secret))]
    pub async fn authenticate_node(&self, node_id: &str, secret: &str) -> Result<()> {
        let response = self
            .http
            .post(self.authenticate_url(node_id))
            .body(secret.to_string())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::from_response(status, &body))
    }
}
