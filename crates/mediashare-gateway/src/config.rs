//! Gateway configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Gateway server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// JWT secret for bearer token validation
    pub jwt_secret: Option<String>,
    /// Enable authentication
    pub auth_enabled: bool,
    /// Lifetime of development sessions when authentication is disabled (seconds)
    pub dev_session_ttl_secs: u64,
    /// Timeout of every gateway-to-node call (seconds)
    pub node_timeout_secs: u64,
    /// Timeout of every metadata store call (seconds)
    pub store_timeout_secs: u64,
    /// Rate limit (requests per second per user)
    pub rate_limit_rps: u32,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
    /// JSON seed with group memberships and nodes
    pub seed_path: Option<PathBuf>,
    /// Enable CORS
    pub cors_enabled: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: None,
            auth_enabled: true,
            dev_session_ttl_secs: 24 * 60 * 60, // 24 hours
            node_timeout_secs: 5,
            store_timeout_secs: 30,
            rate_limit_rps: 100,
            max_body_size: 256 * 1024 * 1024, // 256 MB
            seed_path: None,
            cors_enabled: true,
        }
    }
}

impl GatewayConfig {
    /// Get the bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Gateway-to-node call timeout
    pub fn node_timeout(&self) -> Duration {
        Duration::from_secs(self.node_timeout_secs)
    }

    /// Metadata store call timeout
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}
