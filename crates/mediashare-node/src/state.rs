//! Application state

use crate::links::{AccessLinkPublisher, TomlRulePublisher};
use crate::{FileStore, NodeConfig, NodeSessionStore};
use std::sync::Arc;

/// Application state shared across handlers
pub struct NodeState {
    /// Node configuration
    pub config: NodeConfig,
    /// Users authorized on this node
    pub sessions: NodeSessionStore,
    /// Local file store
    pub files: FileStore,
    /// Reverse-proxy rule publisher
    pub links: Arc<dyn AccessLinkPublisher>,
}

impl NodeState {
    /// Create the state from configuration with the TOML rule publisher
    pub fn new(config: NodeConfig) -> Self {
        let links = Arc::new(TomlRulePublisher::new(
            config.rules_dir.clone(),
            config.proxy_service.clone(),
        ));
        Self::with_publisher(config, links)
    }

    /// Create the state with an explicit publisher
    pub fn with_publisher(config: NodeConfig, links: Arc<dyn AccessLinkPublisher>) -> Self {
        Self {
            sessions: NodeSessionStore::new(config.session_ttl()),
            files: FileStore::new(config.base_dir.clone()),
            links,
            config,
        }
    }
}
