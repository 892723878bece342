//! Registry of nodes that proved their identity to the gateway

use mediashare_core::{Node, NodeId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Trust state of a node as seen by the gateway
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    /// Never registered, rejected, or removed
    Unknown,
    /// A registration attempt is being checked
    Authenticating,
    /// Secret confirmed; the node may be used
    Authenticated,
}

#[derive(Clone, Debug)]
enum Entry {
    Authenticating,
    Authenticated(Node),
}

/// In-memory table of nodes keyed by identity.
///
/// Cloning shares the table. One lock guards the whole map.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    entries: Arc<Mutex<HashMap<NodeId, Entry>>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a registration attempt as in progress.
    ///
    /// An already authenticated node keeps serving until the attempt is
    /// decided.
    pub fn begin(&self, id: &str) {
        self.entries
            .lock()
            .entry(id.to_string())
            .or_insert(Entry::Authenticating);
    }

    /// Insert or overwrite a node whose secret was confirmed
    pub fn confirm(&self, node: Node) {
        self.entries
            .lock()
            .insert(node.id.clone(), Entry::Authenticated(node));
    }

    /// Drop the node after a failed attempt. Returns the previous state.
    pub fn reject(&self, id: &str) -> NodeState {
        state_of(self.entries.lock().remove(id).as_ref())
    }

    /// Forget the node (deleted, or its secret was refreshed)
    pub fn remove(&self, id: &str) -> Option<Node> {
        match self.entries.lock().remove(id) {
            Some(Entry::Authenticated(node)) => Some(node),
            _ => None,
        }
    }

    /// Current state of a node
    pub fn state(&self, id: &str) -> NodeState {
        state_of(self.entries.lock().get(id))
    }

    /// An authenticated node
    pub fn get(&self, id: &str) -> Option<Node> {
        match self.entries.lock().get(id) {
            Some(Entry::Authenticated(node)) => Some(node.clone()),
            _ => None,
        }
    }

    /// Every authenticated node
    pub fn authenticated(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = self
            .entries
            .lock()
            .values()
            .filter_map(|entry| match entry {
                Entry::Authenticated(node) => Some(node.clone()),
                Entry::Authenticating => None,
            })
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// Number of authenticated nodes
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|e| matches!(e, Entry::Authenticated(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn state_of(entry: Option<&Entry>) -> NodeState {
    match entry {
        None => NodeState::Unknown,
        Some(Entry::Authenticating) => NodeState::Authenticating,
        Some(Entry::Authenticated(_)) => NodeState::Authenticated,
    }
}
