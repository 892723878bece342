//! Node, media, and sharing types

use crate::{CoreError, Result, THUMBNAIL_SUFFIX};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Opaque node identity
pub type NodeId = String;

/// Media record identity
pub type MediaId = String;

/// Group identity (also the name of the group's storage area)
pub type GroupId = String;

/// A record with exactly one creator and zero or more authorized groups
pub trait Owned {
    /// Username of the creator
    fn creator(&self) -> &str;

    /// Groups granted access to the record
    fn group_ids(&self) -> &BTreeSet<GroupId>;
}

/// Backend kind of a storage node
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Files on the node's local filesystem
    #[default]
    Filesystem,
    /// Files on a network share mounted by the node
    Nfs,
    /// Files in an object store fronted by the node
    ObjectStore,
}

/// A storage node as known to the gateway
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    /// Node identity
    pub id: NodeId,
    /// Display title
    pub title: String,
    /// Owning user
    pub creator: String,
    /// Backend kind
    #[serde(default)]
    pub kind: NodeKind,
    /// Pre-shared secret
    pub secret: String,
    /// Groups granted access to the node
    #[serde(default)]
    pub groups: BTreeSet<GroupId>,
    /// Control-plane endpoint (authenticate, upload, share)
    pub api_url: String,
    /// Data-plane endpoint (reverse proxy serving files)
    pub data_url: String,
    /// Creation time
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Node {
    /// Create a node with a freshly generated secret
    pub fn new(
        id: impl Into<NodeId>,
        title: impl Into<String>,
        creator: impl Into<String>,
        api_url: impl Into<String>,
        data_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            creator: creator.into(),
            kind: NodeKind::default(),
            secret: crate::generate_secret(),
            groups: BTreeSet::new(),
            api_url: api_url.into(),
            data_url: data_url.into(),
            created_at: Utc::now(),
        }
    }

    /// Set the secret
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    /// Grant a group access to the node
    pub fn with_group(mut self, group: impl Into<GroupId>) -> Self {
        self.groups.insert(group.into());
        self
    }

    /// Set the backend kind
    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Check whether `username` may use this node (creator or group member)
    pub fn is_accessible_by(&self, username: &str, groups: &BTreeSet<GroupId>) -> bool {
        self.creator == username || !self.groups.is_disjoint(groups)
    }

    /// Public view of the node; the secret is included only for its creator
    pub fn view_for(&self, username: &str) -> NodeView {
        NodeView {
            id: self.id.clone(),
            title: self.title.clone(),
            creator: self.creator.clone(),
            kind: self.kind,
            groups: self.groups.clone(),
            api_url: self.api_url.clone(),
            data_url: self.data_url.clone(),
            secret: (self.creator == username).then(|| self.secret.clone()),
        }
    }
}

impl Owned for Node {
    fn creator(&self) -> &str {
        &self.creator
    }

    fn group_ids(&self) -> &BTreeSet<GroupId> {
        &self.groups
    }
}

/// Serializable node view
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeView {
    pub id: NodeId,
    pub title: String,
    pub creator: String,
    pub kind: NodeKind,
    pub groups: BTreeSet<GroupId>,
    pub api_url: String,
    pub data_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Metadata for one uploaded media file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Record identity
    pub id: MediaId,
    /// Node holding the file
    pub node_id: NodeId,
    /// Uploading user
    pub creator: String,
    /// File name in the creator's own area
    pub filename: String,
    /// Groups the file is shared with
    #[serde(default)]
    pub groups: BTreeSet<GroupId>,
    /// Upload time
    pub uploaded_at: DateTime<Utc>,
}

impl MediaRecord {
    /// Create a record for a fresh upload
    pub fn new(
        node_id: impl Into<NodeId>,
        creator: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            node_id: node_id.into(),
            creator: creator.into(),
            filename: filename.into(),
            groups: BTreeSet::new(),
            uploaded_at: Utc::now(),
        }
    }

    /// Share the record with a group
    pub fn with_group(mut self, group: impl Into<GroupId>) -> Self {
        self.groups.insert(group.into());
        self
    }
}

impl Owned for MediaRecord {
    fn creator(&self) -> &str {
        &self.creator
    }

    fn group_ids(&self) -> &BTreeSet<GroupId> {
        &self.groups
    }
}

/// Cross product of file names and groups, the unit of work for share operations
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesGroupsMap {
    pub filenames: Vec<String>,
    pub groups: Vec<GroupId>,
}

impl FilesGroupsMap {
    /// Create a map from file names and groups
    pub fn new(filenames: Vec<String>, groups: Vec<GroupId>) -> Self {
        Self { filenames, groups }
    }

    /// Both lists must be non-empty
    pub fn validate(&self) -> Result<()> {
        if self.filenames.is_empty() {
            return Err(CoreError::validation("no filenames given"));
        }
        if self.groups.is_empty() {
            return Err(CoreError::validation("no groups given"));
        }
        Ok(())
    }

    /// Iterate every (filename, group) pair
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filenames.iter().flat_map(move |file| {
            self.groups
                .iter()
                .map(move |group| (file.as_str(), group.as_str()))
        })
    }
}

/// One (file, group) pair that could not be processed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedShare {
    pub filename: String,
    pub group: GroupId,
    pub reason: String,
}

impl FailedShare {
    pub fn new(
        filename: impl Into<String>,
        group: impl Into<GroupId>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            group: group.into(),
            reason: reason.into(),
        }
    }
}

/// Derive the thumbnail file name: `photo.jpg` becomes `photo_thumb.jpg`
///
/// The name must contain exactly one extension separator with a non-empty
/// stem and extension.
pub fn thumbnail_name(filename: &str) -> Result<String> {
    let mut parts = filename.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(stem), Some(ext), None) if !stem.is_empty() && !ext.is_empty() => {
            Ok(format!("{stem}{THUMBNAIL_SUFFIX}.{ext}"))
        }
        _ => Err(CoreError::validation(format!(
            "filename {filename:?} must have exactly one extension"
        ))),
    }
}

/// Check that a username, group, or file name is usable as a single path segment
pub fn validate_segment(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(CoreError::validation(format!("{kind} is empty")));
    }
    if value == "." || value == ".." || value.contains(['/', '\\', '\0']) {
        return Err(CoreError::validation(format!(
            "{kind} {value:?} is not a valid path segment"
        )));
    }
    Ok(())
}
