//! Node configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Storage node configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Identity registered at the gateway
    pub node_id: String,
    /// Pre-shared secret, also required from the gateway on every call
    pub secret: String,
    /// Gateway base URL
    pub gateway_url: String,
    /// Root of the `user/` and `group/` storage areas
    pub base_dir: PathBuf,
    /// Directory the reverse proxy watches for rule files
    pub rules_dir: PathBuf,
    /// Reverse proxy service serving `base_dir`
    pub proxy_service: String,
    /// Group folders created at startup
    pub groups: Vec<String>,
    /// Lifetime of a user session on this node (seconds)
    pub session_ttl_secs: u64,
    /// Delay between gateway registration attempts (seconds)
    pub retry_interval_secs: u64,
    /// Timeout of node-to-gateway calls (seconds)
    pub gateway_timeout_secs: u64,
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: "node-1".to_string(),
            secret: String::new(),
            gateway_url: "http://localhost:8080".to_string(),
            base_dir: PathBuf::from("data"),
            rules_dir: PathBuf::from("rules"),
            proxy_service: "mediashare-files".to_string(),
            groups: Vec::new(),
            session_ttl_secs: 24 * 60 * 60, // 24 hours
            retry_interval_secs: 10,
            gateway_timeout_secs: 5,
            host: "0.0.0.0".to_string(),
            port: 8081,
            max_body_size: 256 * 1024 * 1024, // 256 MB
        }
    }
}

impl NodeConfig {
    /// Get the bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Session lifetime
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_ttl_secs as i64)
    }

    /// Delay between registration attempts
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    /// Node-to-gateway call timeout
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }
}
