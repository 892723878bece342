//! # Mediashare Core
//!
//! Shared building blocks for the Mediashare gateway and storage nodes.
//!
//! This crate provides:
//! - **Ownership records**: nodes and media, each with one creator and a set of groups
//! - **Permission predicates**: the owner/group filter applied to every metadata query
//! - **Metadata storage**: the `MetadataStore` trait and an in-memory implementation
//! - **Secrets**: token generation and constant-time secret comparison
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Gateway HTTP handlers            │
//! ├─────────────────────────────────────────┤
//! │   Permission  ──►  NodeQuery/MediaQuery │
//! ├─────────────────────────────────────────┤
//! │           MetadataStore                 │
//! ├─────────────────────────────────────────┤
//! │   MemoryMetadataStore (or a database)   │
//! └─────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod model;
pub mod permission;
pub mod store;
pub mod token;

pub use error::{CoreError, Result};
pub use memory::{MemoryMetadataStore, Seed};
pub use model::{
    thumbnail_name, validate_segment, FailedShare, FilesGroupsMap, GroupId, MediaId, MediaRecord, Node, NodeId,
    NodeKind, NodeView, Owned,
};
pub use permission::Permission;
pub use store::{MediaQuery, MetadataStore, NodeQuery};
pub use token::{generate_secret, generate_token, secrets_match};

/// Suffix inserted before the extension of a thumbnail file name
pub const THUMBNAIL_SUFFIX: &str = "_thumb";

/// Name of the thumbnail subfolder in every storage area
pub const THUMBNAIL_DIR: &str = "thumb";
