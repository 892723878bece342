//! # Mediashare Gateway
//!
//! Central service holding media metadata, user sessions, and the trust
//! relationship with every storage node.
//!
//! This crate provides:
//! - **Node Registry**: nodes that proved their identity with their shared secret
//! - **Session Store**: active user sessions, each with a per-node token map
//! - **Node Authentication**: minting per-node tokens and pushing them to nodes
//! - **Media API**: permission-scoped metadata with per-node file URLs
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   HTTP Clients                      │
//! └─────────────────────────┬───────────────────────────┘
//!                           │ Bearer <jwt>
//! ┌─────────────────────────▼───────────────────────────┐
//! │                 Mediashare Gateway                  │
//! ├─────────────────────────────────────────────────────┤
//! │  Auth Middleware │ Rate Limiter │ Session Store     │
//! ├─────────────────────────────────────────────────────┤
//! │  Node / Session / Media handlers                    │
//! ├──────────────────────────┬──────────────────────────┤
//! │  MetadataStore           │  Node Registry           │
//! │  (Permission-scoped)     │  NodeAuthenticator ──────┼──► storage nodes
//! └──────────────────────────┴──────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod node_auth;
pub mod registry;
pub mod routes;
pub mod server;
pub mod session;
pub mod state;

pub use auth::{DevIdentityProvider, Identity, IdentityProvider, JwtIdentityProvider};
pub use config::GatewayConfig;
pub use error::{ApiError, ErrorCode};
pub use node_auth::{NodeAuthReport, NodeAuthenticator, SkipReason, SkippedNode};
pub use registry::{NodeRegistry, NodeState};
pub use server::{run_server, run_server_with_shutdown, serve};
pub use session::{GatewaySession, SessionStore};
pub use state::AppState;
