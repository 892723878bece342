//! # Mediashare Node
//!
//! Storage node holding the media files of its users and groups.
//!
//! This crate provides:
//! - **Session Store**: users the gateway authorized on this node
//! - **File Store**: originals, thumbnails, and hardlink group shares
//! - **Access Links**: reverse-proxy rules per session token
//! - **Registration**: proving the node's identity to the gateway at boot
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  Bearer <node secret>   ┌──────────────────────────┐
//! │   Gateway    │ ──────────────────────► │      Mediashare Node     │
//! └──────────────┘ ◄────────────────────── ├──────────────────────────┤
//!                    POST /node/{id}/auth  │ Session Store            │
//!                                          │ File Store ─► base_dir   │
//!                                          │ Access Links ─► rules_dir│
//!                                          └──────────────────────────┘
//!                                                       ▲
//!                          GET /<token>/own/<file>      │
//!                 clients ───────► reverse proxy ───────┘
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod links;
pub mod middleware;
pub mod registration;
pub mod routes;
pub mod server;
pub mod session;
pub mod state;
pub mod storage;

pub use config::NodeConfig;
pub use error::{ErrorCode, NodeError, Result};
pub use links::{AccessLinkPublisher, TomlRulePublisher};
pub use registration::{register_with_gateway, spawn_registration};
pub use server::{run_server, run_server_with_shutdown, serve};
pub use session::{AddOutcome, NodeSession, NodeSessionStore};
pub use state::NodeState;
pub use storage::{DeleteOutcome, FileStore};
