//! Gateway session store

use crate::auth::Identity;
use chrono::{DateTime, Utc};
use mediashare_core::{GroupId, NodeId, Permission};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// An active user session.
///
/// The default value is the empty session returned for unknown users.
#[derive(Clone, Debug, Default, Serialize)]
pub struct GatewaySession {
    /// Username
    pub username: String,
    /// Externally issued bearer token
    #[serde(skip)]
    pub token: String,
    /// When the bearer token expires
    pub expires_at: DateTime<Utc>,
    /// Groups the user belonged to when the session was created
    pub groups: BTreeSet<GroupId>,
    /// Per-node access tokens, filled as the user is authenticated to nodes
    pub node_tokens: HashMap<NodeId, String>,
}

impl GatewaySession {
    /// Create a session for a freshly introspected bearer token
    pub fn new(identity: Identity, token: impl Into<String>, groups: BTreeSet<GroupId>) -> Self {
        Self {
            username: identity.username,
            token: token.into(),
            expires_at: identity.expires_at,
            groups,
            node_tokens: HashMap::new(),
        }
    }

    /// Check if the session is the empty placeholder
    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.token.is_empty()
    }

    /// Check if the bearer token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Permission predicate for this user
    pub fn permission(&self, owner_only: bool) -> Permission {
        Permission::build(&self.groups, &self.username, owner_only)
    }

    /// Token for a node, if the user is authenticated to it
    pub fn node_token(&self, node_id: &str) -> Option<&str> {
        self.node_tokens.get(node_id).map(String::as_str)
    }
}

#[derive(Default)]
struct Sessions {
    by_token: HashMap<String, GatewaySession>,
    by_username: HashMap<String, String>,
}

/// Active sessions, addressed by bearer token and by username.
///
/// One session per user: a new bearer token for a known user replaces the
/// old session and inherits its node tokens. Cloning shares the table.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<Sessions>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session, replacing any previous session of the same user
    pub fn insert(&self, mut session: GatewaySession) -> GatewaySession {
        let mut sessions = self.inner.lock();
        if let Some(old_token) = sessions.by_username.get(&session.username).cloned() {
            if let Some(old) = sessions.by_token.remove(&old_token) {
                for (node_id, token) in old.node_tokens {
                    session.node_tokens.entry(node_id).or_insert(token);
                }
            }
        }
        sessions
            .by_username
            .insert(session.username.clone(), session.token.clone());
        sessions
            .by_token
            .insert(session.token.clone(), session.clone());
        session
    }

    /// Session for a bearer token
    pub fn get_by_token(&self, token: &str) -> Option<GatewaySession> {
        self.inner.lock().by_token.get(token).cloned()
    }

    /// Session for a user, or the empty session
    pub fn get_by_username(&self, username: &str) -> GatewaySession {
        let sessions = self.inner.lock();
        sessions
            .by_username
            .get(username)
            .and_then(|token| sessions.by_token.get(token))
            .cloned()
            .unwrap_or_default()
    }

    /// Remove a session, matched on its token
    pub fn remove(&self, session: &GatewaySession) -> Option<GatewaySession> {
        let mut sessions = self.inner.lock();
        let removed = sessions.by_token.remove(&session.token)?;
        if sessions.by_username.get(&removed.username) == Some(&removed.token) {
            sessions.by_username.remove(&removed.username);
        }
        Some(removed)
    }

    /// Record the node token of a session. Returns false if the session is gone.
    pub fn set_node_token(&self, session_token: &str, node_id: &str, node_token: String) -> bool {
        match self.inner.lock().by_token.get_mut(session_token) {
            Some(session) => {
                session.node_tokens.insert(node_id.to_string(), node_token);
                true
            }
            None => false,
        }
    }

    /// Forget the node token of a session
    pub fn remove_node_token(&self, session_token: &str, node_id: &str) -> Option<String> {
        self.inner
            .lock()
            .by_token
            .get_mut(session_token)
            .and_then(|session| session.node_tokens.remove(node_id))
    }

    /// Forget a node in every session
    pub fn forget_node(&self, node_id: &str) {
        for session in self.inner.lock().by_token.values_mut() {
            session.node_tokens.remove(node_id);
        }
    }

    /// Number of sessions
    pub fn len(&self) -> usize {
        self.inner.lock().by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
