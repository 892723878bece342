//! # Mediashare Client
//!
//! Typed HTTP clients for the two directions of the node trust protocol.
//!
//! - [`NodeClient`]: the gateway calling a storage node. Authenticates with
//!   the node's pre-shared secret and carries per-user node tokens.
//! - [`GatewayClient`]: a storage node registering itself with the gateway.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mediashare_client::{ClientConfig, NodeClient};
//!
//! let node = NodeClient::new("http://node-1:8081", "s1", ClientConfig::default())?;
//! node.authenticate_user("alice", &token).await?;
//! ```

mod config;
mod error;
mod gateway;
mod node;
mod types;

pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use gateway::GatewayClient;
pub use node::NodeClient;
pub use types::*;
