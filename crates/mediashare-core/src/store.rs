//! Metadata store trait and permission-scoped queries

use crate::{
    model::{GroupId, MediaId, MediaRecord, Node, NodeId},
    CoreError, Permission, Result,
};
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Query over node records.
///
/// A permission predicate is mandatory; the store rejects queries built
/// without one with [`CoreError::MissingPermission`].
#[derive(Clone, Debug, Default)]
pub struct NodeQuery {
    id: Option<NodeId>,
    permission: Option<Permission>,
}

impl NodeQuery {
    /// Create an empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a single node
    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach the permission predicate
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    /// Requested node id
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Requested node id, required for single-record operations
    pub fn require_id(&self) -> Result<&str> {
        self.id()
            .ok_or_else(|| CoreError::validation("query has no node id"))
    }

    /// The permission predicate, failing if none was attached
    pub fn permission(&self) -> Result<&Permission> {
        self.permission.as_ref().ok_or(CoreError::MissingPermission)
    }

    /// Evaluate the whole query (id match AND permission) against a node
    pub fn matches(&self, node: &Node) -> Result<bool> {
        let permission = self.permission()?;
        let id_matches = self.id.as_ref().is_none_or(|id| *id == node.id);
        Ok(id_matches && permission.matches(node))
    }
}

/// Query over media records.
#[derive(Clone, Debug, Default)]
pub struct MediaQuery {
    id: Option<MediaId>,
    node_id: Option<NodeId>,
    permission: Option<Permission>,
}

impl MediaQuery {
    /// Create an empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a single record
    pub fn with_id(mut self, id: impl Into<MediaId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Restrict to records stored on one node
    pub fn on_node(mut self, node_id: impl Into<NodeId>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    /// Attach the permission predicate
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    /// Requested record id
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Requested record id, required for single-record operations
    pub fn require_id(&self) -> Result<&str> {
        self.id()
            .ok_or_else(|| CoreError::validation("query has no media id"))
    }

    /// The permission predicate, failing if none was attached
    pub fn permission(&self) -> Result<&Permission> {
        self.permission.as_ref().ok_or(CoreError::MissingPermission)
    }

    /// Evaluate the whole query against a record
    pub fn matches(&self, record: &MediaRecord) -> Result<bool> {
        let permission = self.permission()?;
        let id_matches = self.id.as_ref().is_none_or(|id| *id == record.id);
        let node_matches = self
            .node_id
            .as_ref()
            .is_none_or(|node_id| *node_id == record.node_id);
        Ok(id_matches && node_matches && permission.matches(record))
    }
}

/// Persistence for nodes, media records, and group memberships
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Groups the user belongs to
    async fn groups_for_user(&self, username: &str) -> Result<BTreeSet<GroupId>>;

    /// Add a user to a group
    async fn add_group_member(&self, group: &str, username: &str) -> Result<()>;

    /// Insert a new node
    async fn insert_node(&self, node: Node) -> Result<()>;

    /// Look a node up by identity without any permission scope.
    ///
    /// Only node self-registration uses this; it authenticates by secret,
    /// not by user.
    async fn find_node(&self, id: &str) -> Result<Option<Node>>;

    /// Nodes matching the query
    async fn query_nodes(&self, query: &NodeQuery) -> Result<Vec<Node>>;

    /// Replace the secret of the node matching the query
    async fn update_node_secret(&self, query: &NodeQuery, secret: String) -> Result<Node>;

    /// Delete the node matching the query
    async fn delete_node(&self, query: &NodeQuery) -> Result<Option<Node>>;

    /// Insert a new media record
    async fn insert_media(&self, record: MediaRecord) -> Result<()>;

    /// Media records matching the query
    async fn query_media(&self, query: &MediaQuery) -> Result<Vec<MediaRecord>>;

    /// Replace the group set of the record matching the query
    async fn update_media_groups(
        &self,
        query: &MediaQuery,
        groups: BTreeSet<GroupId>,
    ) -> Result<MediaRecord>;

    /// Delete the record matching the query
    async fn delete_media(&self, query: &MediaQuery) -> Result<Option<MediaRecord>>;

    /// First node matching the query
    async fn get_node(&self, query: &NodeQuery) -> Result<Option<Node>> {
        query.require_id()?;
        Ok(self.query_nodes(query).await?.into_iter().next())
    }

    /// First media record matching the query
    async fn get_media(&self, query: &MediaQuery) -> Result<Option<MediaRecord>> {
        query.require_id()?;
        Ok(self.query_media(query).await?.into_iter().next())
    }
}
