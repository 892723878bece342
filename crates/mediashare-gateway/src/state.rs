//! Application state

use crate::auth::{DevIdentityProvider, IdentityProvider, JwtIdentityProvider};
use crate::{ApiError, ErrorCode, GatewayConfig, NodeAuthenticator, NodeRegistry, SessionStore};
use mediashare_core::{MemoryMetadataStore, MetadataStore};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// Application state shared across handlers
pub struct AppState {
    /// Gateway configuration
    pub config: GatewayConfig,
    /// Metadata store
    pub store: Arc<dyn MetadataStore>,
    /// Bearer token validation
    pub identity: Arc<dyn IdentityProvider>,
    /// Nodes that proved their identity
    pub registry: NodeRegistry,
    /// Active user sessions
    pub sessions: SessionStore,
    /// Node trust handshake
    pub node_auth: NodeAuthenticator,
}

impl AppState {
    /// Create the state from configuration, loading the seed file if one is set
    pub async fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let store = match &config.seed_path {
            Some(path) => {
                let json = tokio::fs::read_to_string(path).await?;
                let store = MemoryMetadataStore::from_seed_json(&json)?;
                info!(
                    path = %path.display(),
                    nodes = store.node_count(),
                    "Loaded metadata seed"
                );
                store
            }
            None => {
                warn!("No seed file configured, starting with an empty directory");
                MemoryMetadataStore::new()
            }
        };

        let identity: Arc<dyn IdentityProvider> = if config.auth_enabled {
            let secret = config
                .jwt_secret
                .clone()
                .ok_or_else(|| anyhow::anyhow!("JWT secret not configured"))?;
            Arc::new(JwtIdentityProvider::new(secret))
        } else {
            let ttl = chrono::Duration::seconds(config.dev_session_ttl_secs as i64);
            Arc::new(DevIdentityProvider::new(ttl))
        };

        Ok(Self::with_parts(config, Arc::new(store), identity))
    }

    /// Assemble the state from explicit parts
    pub fn with_parts(
        config: GatewayConfig,
        store: Arc<dyn MetadataStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let registry = NodeRegistry::new();
        let sessions = SessionStore::new();
        let node_auth = NodeAuthenticator::new(
            registry.clone(),
            sessions.clone(),
            Arc::clone(&store),
            config.node_timeout(),
        );

        Self {
            config,
            store,
            identity,
            registry,
            sessions,
            node_auth,
        }
    }

    /// Run a store call under the store timeout
    pub async fn store_call<T, F>(&self, call: F) -> Result<T, ApiError>
    where
        F: Future<Output = mediashare_core::Result<T>>,
    {
        match tokio::time::timeout(self.config.store_timeout(), call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ApiError::new(
                ErrorCode::Timeout,
                "Metadata store did not answer in time",
            )),
        }
    }
}
