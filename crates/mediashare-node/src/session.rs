//! Users currently authorized on this node

use crate::{NodeError, Result};
use chrono::{DateTime, Duration, Utc};
use mediashare_core::secrets_match;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// One user's session on this node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeSession {
    pub username: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl NodeSession {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// What an insert changed
#[derive(Debug, Default)]
pub struct AddOutcome {
    /// Token replaced by a refresh of an existing session
    pub replaced_token: Option<String>,
    /// Expired sessions swept before inserting a new one
    pub expired: Vec<NodeSession>,
}

/// Sessions keyed by username, at most one per user.
///
/// Cloning shares the table. One lock guards the whole map.
#[derive(Clone)]
pub struct NodeSessionStore {
    ttl: Duration,
    sessions: Arc<Mutex<HashMap<String, NodeSession>>>,
}

impl NodeSessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Authorize `username` with `token`.
    ///
    /// An existing session is refreshed in place. Otherwise expired sessions
    /// are swept first and returned so their access links can be revoked.
    pub fn add_session(&self, username: &str, token: &str) -> Result<AddOutcome> {
        if username.is_empty() {
            return Err(NodeError::invalid("username must not be empty"));
        }
        if token.is_empty() {
            return Err(NodeError::invalid("token must not be empty"));
        }

        let expires_at = Utc::now() + self.ttl;
        let mut sessions = self.sessions.lock();

        if let Some(session) = sessions.get_mut(username) {
            let previous = std::mem::replace(&mut session.token, token.to_string());
            session.expires_at = expires_at;
            return Ok(AddOutcome {
                replaced_token: (previous != token).then_some(previous),
                expired: Vec::new(),
            });
        }

        let expired_users: Vec<String> = sessions
            .values()
            .filter(|s| s.is_expired())
            .map(|s| s.username.clone())
            .collect();
        let expired = expired_users
            .iter()
            .filter_map(|user| sessions.remove(user))
            .collect();

        sessions.insert(
            username.to_string(),
            NodeSession {
                username: username.to_string(),
                token: token.to_string(),
                expires_at,
            },
        );

        Ok(AddOutcome {
            replaced_token: None,
            expired,
        })
    }

    /// Drop the user's session
    pub fn remove(&self, username: &str) -> Option<NodeSession> {
        self.sessions.lock().remove(username)
    }

    /// The user's live session
    pub fn get(&self, username: &str) -> Option<NodeSession> {
        self.sessions
            .lock()
            .get(username)
            .filter(|s| !s.is_expired())
            .cloned()
    }

    /// Check a presented token against the user's live session
    pub fn verify(&self, username: &str, token: &str) -> bool {
        self.get(username)
            .is_some_and(|session| secrets_match(&session.token, token))
    }

    /// Number of sessions, expired ones included until swept
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "t1")]
    #[case("alice", "")]
    fn test_rejects_empty_fields(#[case] username: &str, #[case] token: &str) {
        let store = NodeSessionStore::new(Duration::hours(1));
        let error = store.add_session(username, token).unwrap_err();
        assert!(matches!(error, NodeError::Api { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_refresh_overwrites_in_place() {
        let store = NodeSessionStore::new(Duration::hours(1));
        store.add_session("alice", "t1").unwrap();
        let outcome = store.add_session("alice", "t2").unwrap();

        assert_eq!(outcome.replaced_token.as_deref(), Some("t1"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("alice").unwrap().token, "t2");
        assert!(store.verify("alice", "t2"));
        assert!(!store.verify("alice", "t1"));
    }

    #[test]
    fn test_same_token_refresh_replaces_nothing() {
        let store = NodeSessionStore::new(Duration::hours(1));
        store.add_session("alice", "t1").unwrap();
        let outcome = store.add_session("alice", "t1").unwrap();
        assert!(outcome.replaced_token.is_none());
    }

    #[test]
    fn test_insert_sweeps_expired_sessions() {
        let store = NodeSessionStore::new(Duration::seconds(-1));
        store.add_session("alice", "t1").unwrap();
        store.add_session("bob", "t2").unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.get("bob").is_none());
        assert!(!store.verify("bob", "t2"));
    }

    #[test]
    fn test_sweep_reports_expired() {
        let store = NodeSessionStore::new(Duration::seconds(-1));
        store.add_session("alice", "t1").unwrap();
        let outcome = store.add_session("bob", "t2").unwrap();
        assert_eq!(outcome.expired.len(), 1);
        assert_eq!(outcome.expired[0].token, "t1");
    }

    #[test]
    fn test_remove() {
        let store = NodeSessionStore::new(Duration::hours(1));
        store.add_session("alice", "t1").unwrap();
        assert_eq!(store.remove("alice").unwrap().token, "t1");
        assert!(store.remove("alice").is_none());
    }
}
