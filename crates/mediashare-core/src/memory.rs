//! In-memory metadata store for development and testing

use crate::{
    model::{GroupId, MediaRecord, Node},
    store::{MediaQuery, MetadataStore, NodeQuery},
    CoreError, Result,
};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// An in-memory metadata store
#[derive(Clone, Default)]
pub struct MemoryMetadataStore {
    nodes: Arc<DashMap<String, Node>>,
    media: Arc<DashMap<String, MediaRecord>>,
    /// group -> members
    groups: Arc<DashMap<GroupId, BTreeSet<String>>>,
}

/// Seed data for an in-memory store
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    /// group -> members
    #[serde(default)]
    pub groups: BTreeMap<GroupId, Vec<String>>,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl MemoryMetadataStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store populated from seed data
    pub fn from_seed(seed: Seed) -> Self {
        let store = Self::new();
        for (group, members) in seed.groups {
            store.groups.insert(group, members.into_iter().collect());
        }
        for node in seed.nodes {
            store.nodes.insert(node.id.clone(), node);
        }
        tracing::debug!(
            groups = store.groups.len(),
            nodes = store.nodes.len(),
            "Metadata store seeded"
        );
        store
    }

    /// Parse seed JSON and build a store from it
    pub fn from_seed_json(json: &str) -> Result<Self> {
        let seed: Seed = serde_json::from_str(json)
            .map_err(|e| CoreError::Storage(format!("invalid seed: {e}")))?;
        Ok(Self::from_seed(seed))
    }

    /// Number of registered nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of media records
    pub fn media_count(&self) -> usize {
        self.media.len()
    }

    fn single_node_key(&self, query: &NodeQuery) -> Result<Option<String>> {
        let id = query.require_id()?;
        match self.nodes.get(id) {
            Some(node) if query.matches(&node)? => Ok(Some(node.id.clone())),
            _ => Ok(None),
        }
    }

    fn single_media_key(&self, query: &MediaQuery) -> Result<Option<String>> {
        let id = query.require_id()?;
        match self.media.get(id) {
            Some(record) if query.matches(&record)? => Ok(Some(record.id.clone())),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn groups_for_user(&self, username: &str) -> Result<BTreeSet<GroupId>> {
        Ok(self
            .groups
            .iter()
            .filter(|entry| entry.value().contains(username))
            .map(|entry| entry.key().clone())
            .collect())
    }

    async fn add_group_member(&self, group: &str, username: &str) -> Result<()> {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(username.to_string());
        Ok(())
    }

    async fn insert_node(&self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(CoreError::AlreadyExists(node.id));
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    async fn find_node(&self, id: &str) -> Result<Option<Node>> {
        Ok(self.nodes.get(id).map(|entry| entry.value().clone()))
    }

    async fn query_nodes(&self, query: &NodeQuery) -> Result<Vec<Node>> {
        query.permission()?;
        let mut nodes = Vec::new();
        for entry in self.nodes.iter() {
            if query.matches(entry.value())? {
                nodes.push(entry.value().clone());
            }
        }
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(nodes)
    }

    async fn update_node_secret(&self, query: &NodeQuery, secret: String) -> Result<Node> {
        let key = self
            .single_node_key(query)?
            .ok_or_else(|| CoreError::NodeNotFound(query.id().unwrap_or_default().to_string()))?;
        let mut node = self
            .nodes
            .get_mut(&key)
            .ok_or_else(|| CoreError::NodeNotFound(key.clone()))?;
        node.secret = secret;
        Ok(node.clone())
    }

    async fn delete_node(&self, query: &NodeQuery) -> Result<Option<Node>> {
        Ok(self
            .single_node_key(query)?
            .and_then(|key| self.nodes.remove(&key))
            .map(|(_, node)| node))
    }

    async fn insert_media(&self, record: MediaRecord) -> Result<()> {
        if self.media.contains_key(&record.id) {
            return Err(CoreError::AlreadyExists(record.id));
        }
        self.media.insert(record.id.clone(), record);
        Ok(())
    }

    async fn query_media(&self, query: &MediaQuery) -> Result<Vec<MediaRecord>> {
        query.permission()?;
        let mut records = Vec::new();
        for entry in self.media.iter() {
            if query.matches(entry.value())? {
                records.push(entry.value().clone());
            }
        }
        records.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(records)
    }

    async fn update_media_groups(
        &self,
        query: &MediaQuery,
        groups: BTreeSet<GroupId>,
    ) -> Result<MediaRecord> {
        let key = self
            .single_media_key(query)?
            .ok_or_else(|| CoreError::MediaNotFound(query.id().unwrap_or_default().to_string()))?;
        let mut record = self
            .media
            .get_mut(&key)
            .ok_or_else(|| CoreError::MediaNotFound(key.clone()))?;
        record.groups = groups;
        Ok(record.clone())
    }

    async fn delete_media(&self, query: &MediaQuery) -> Result<Option<MediaRecord>> {
        Ok(self
            .single_media_key(query)?
            .and_then(|key| self.media.remove(&key))
            .map(|(_, record)| record))
    }
}
