//! Permission predicates for metadata queries
//!
//! A [`Permission`] is built once per request from the caller's identity and
//! group memberships and is then attached to every node or media query. The
//! store evaluates it against each record's creator and group set.

use crate::model::{GroupId, Owned};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Owner/group filter applied to ownership records
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Permission {
    /// Matches no record
    Nothing,
    /// `creator == user`
    Owner { user: String },
    /// `creator == user OR record.groups ∩ groups ≠ ∅`
    OwnerOrGroups {
        user: String,
        groups: BTreeSet<GroupId>,
    },
}

impl Permission {
    /// Build the predicate for `user`.
    ///
    /// An empty user yields [`Permission::Nothing`]. With `owner_only` the
    /// group clause is dropped so only records created by `user` match.
    pub fn build<I, G>(groups: I, user: &str, owner_only: bool) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<GroupId>,
    {
        if user.is_empty() {
            return Self::Nothing;
        }
        if owner_only {
            return Self::Owner {
                user: user.to_string(),
            };
        }
        Self::OwnerOrGroups {
            user: user.to_string(),
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }

    /// Owner-only predicate
    pub fn owner(user: &str) -> Self {
        Self::build(std::iter::empty::<GroupId>(), user, true)
    }

    /// Evaluate the predicate against a record
    pub fn matches(&self, record: &impl Owned) -> bool {
        match self {
            Self::Nothing => false,
            Self::Owner { user } => record.creator() == user,
            Self::OwnerOrGroups { user, groups } => {
                record.creator() == user || !record.group_ids().is_disjoint(groups)
            }
        }
    }

    /// The user this predicate was built for, if any
    pub fn user(&self) -> Option<&str> {
        match self {
            Self::Nothing => None,
            Self::Owner { user } | Self::OwnerOrGroups { user, .. } => Some(user),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MediaRecord;

    fn record(creator: &str, groups: &[&str]) -> MediaRecord {
        groups
            .iter()
            .fold(MediaRecord::new("n1", creator, "f.jpg"), |r, g| r.with_group(*g))
    }

    #[test]
    fn test_empty_user_matches_nothing() {
        let perm = Permission::build(["family"], "", false);
        assert_eq!(perm, Permission::Nothing);
        assert!(!perm.matches(&record("", &[])));
        assert!(!perm.matches(&record("alice", &["family"])));
    }

    #[test]
    fn test_owner_only_drops_group_clause() {
        let perm = Permission::build(["family"], "alice", true);
        assert!(perm.matches(&record("alice", &[])));
        assert!(!perm.matches(&record("bob", &["family"])));
    }

    #[test]
    fn test_owner_or_groups() {
        let perm = Permission::build(["family"], "alice", false);
        assert!(perm.matches(&record("alice", &[])));
        assert!(perm.matches(&record("bob", &["family", "work"])));
        assert!(!perm.matches(&record("bob", &["work"])));
    }

    #[test]
    fn test_no_groups_matches_only_ownership() {
        let perm = Permission::build(Vec::<String>::new(), "alice", false);
        assert!(perm.matches(&record("alice", &["family"])));
        assert!(!perm.matches(&record("bob", &["family"])));
    }
}
