//! Primitive store mutations.
//!
//! The engine never touches storage directly. Each logical edit is expressed
//! as a [`ChangeSet`]: an ordered list of [`Change`]s that a [`NodeStore`]
//! applies atomically. Change sets are serializable so they can be journaled
//! and replayed.
//!
//! [`NodeStore`]: crate::NodeStore

use crate::{
    Container, ContainerId, Membership, Project, ProjectId, PullRequest, Snippet, SnippetId,
    Timestamp, UserId, Version, VersionId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Reference to a container or snippet row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum NodeRef {
    Container(ContainerId),
    Snippet(SnippetId),
}

/// One primitive mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Change {
    /// Insert a project row
    InsertProject(Project),
    /// Replace a project's description
    #[serde(rename_all = "camelCase")]
    DescribeProject {
        project: ProjectId,
        description: String,
    },
    #[serde(rename_all = "camelCase")]
    AddMember { project: ProjectId, user: UserId },
    #[serde(rename_all = "camelCase")]
    RemoveMember { project: ProjectId, user: UserId },
    /// Insert a version row with its initial membership
    #[serde(rename_all = "camelCase")]
    InsertVersion {
        version: Version,
        membership: Membership,
    },
    /// Set a version's commit latch
    #[serde(rename_all = "camelCase")]
    CommitVersion { version: VersionId },
    #[serde(rename_all = "camelCase")]
    SetMergeParent {
        version: VersionId,
        merge_parent: VersionId,
    },
    InsertContainer(Container),
    InsertSnippet(Snippet),
    InsertPullRequest(PullRequest),
    /// Make a node visible in a version, optionally as a root
    #[serde(rename_all = "camelCase")]
    Connect {
        version: VersionId,
        node: NodeRef,
        first_layer: bool,
    },
    /// Remove a node from a version's membership and first-layer sets
    #[serde(rename_all = "camelCase")]
    Disconnect { version: VersionId, node: NodeRef },
}

impl Change {
    /// The version whose membership, latch or lineage this change edits.
    pub fn edited_version(&self) -> Option<&VersionId> {
        match self {
            Change::Connect { version, .. }
            | Change::Disconnect { version, .. }
            | Change::CommitVersion { version }
            | Change::SetMergeParent { version, .. } => Some(version),
            _ => None,
        }
    }
}

/// The changes of one logical edit, applied all-or-nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    /// When the edit was made (milliseconds since epoch)
    pub at: Timestamp,
    pub changes: Vec<Change>,
}

impl ChangeSet {
    /// Create an empty change set.
    pub fn new(at: Timestamp) -> Self {
        Self {
            at,
            changes: Vec::new(),
        }
    }

    /// Append a change.
    pub fn push(&mut self, change: Change) -> &mut Self {
        self.changes.push(change);
        self
    }

    /// Builder form of [`ChangeSet::push`].
    pub fn with(mut self, change: Change) -> Self {
        self.changes.push(change);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Versions this change set edits; their `updated_at` moves to [`ChangeSet::at`].
    pub fn edited_versions(&self) -> BTreeSet<VersionId> {
        self.changes
            .iter()
            .filter_map(Change::edited_version)
            .copied()
            .collect()
    }
}
