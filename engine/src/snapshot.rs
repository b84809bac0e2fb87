//! Snapshot types for persisting and restoring store state.
//!
//! Snapshots are the bridge between the in-memory [`MemoryStore`] and
//! persistent storage. They use ordered maps so the same state always
//! serializes to the same bytes.

use crate::{
    error::Result, Container, ContainerId, Error, Membership, MemoryStore, Project, ProjectId,
    PullRequest, PullRequestId, Snippet, SnippetId, Version, VersionId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time copy of every row and every membership set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    pub projects: BTreeMap<ProjectId, Project>,
    pub versions: BTreeMap<VersionId, Version>,
    /// Membership sets keyed by version
    pub memberships: BTreeMap<VersionId, Membership>,
    pub containers: BTreeMap<ContainerId, Container>,
    pub snippets: BTreeMap<SnippetId, Snippet>,
    #[serde(default)]
    pub pull_requests: BTreeMap<PullRequestId, PullRequest>,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreSnapshot {
    /// Create a new empty snapshot.
    pub fn new() -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            projects: BTreeMap::new(),
            versions: BTreeMap::new(),
            memberships: BTreeMap::new(),
            containers: BTreeMap::new(),
            snippets: BTreeMap::new(),
            pull_requests: BTreeMap::new(),
        }
    }

    /// Count container and snippet rows.
    pub fn node_count(&self) -> usize {
        self.containers.len() + self.snippets.len()
    }

    /// Check referential integrity.
    ///
    /// Every version and pull request belongs to a known project, every
    /// version has a membership that references known rows, and first-layer
    /// sets are subsets of the full sets.
    pub fn validate(&self) -> Result<()> {
        for (id, version) in &self.versions {
            if version.id != *id {
                return Err(invalid(format!("version keyed as {id} has id {}", version.id)));
            }
            if !self.projects.contains_key(&version.project_id) {
                return Err(invalid(format!(
                    "version {id} belongs to unknown project {}",
                    version.project_id
                )));
            }
            for link in version.parent_id.iter().chain(&version.merge_parent_id) {
                if !self.versions.contains_key(link) {
                    return Err(invalid(format!("version {id} links unknown version {link}")));
                }
            }
            if !self.memberships.contains_key(id) {
                return Err(invalid(format!("version {id} has no membership")));
            }
        }

        for (version, membership) in &self.memberships {
            if !self.versions.contains_key(version) {
                return Err(invalid(format!("membership for unknown version {version}")));
            }
            if let Some(id) = membership
                .containers
                .iter()
                .find(|id| !self.containers.contains_key(id))
            {
                return Err(invalid(format!("version {version} holds unknown container {id}")));
            }
            if let Some(id) = membership
                .snippets
                .iter()
                .find(|id| !self.snippets.contains_key(id))
            {
                return Err(invalid(format!("version {version} holds unknown snippet {id}")));
            }
            if !membership
                .first_layer_containers
                .is_subset(&membership.containers)
                || !membership.first_layer_snippets.is_subset(&membership.snippets)
            {
                return Err(invalid(format!(
                    "version {version} has first-layer nodes outside its membership"
                )));
            }
        }

        if let Some(pr) = self
            .pull_requests
            .values()
            .find(|pr| !self.projects.contains_key(&pr.project_id))
        {
            return Err(invalid(format!(
                "pull request {} belongs to unknown project {}",
                pr.id, pr.project_id
            )));
        }

        Ok(())
    }

    /// Serialize to JSON with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON with deterministic ordering.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        Ok(snapshot)
    }
}

fn invalid(reason: String) -> Error {
    Error::InvalidSnapshot(reason)
}

/// Metadata about a snapshot (without the full data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub format_version: u32,
    pub project_count: usize,
    pub version_count: usize,
    pub container_count: usize,
    pub snippet_count: usize,
    pub pull_request_count: usize,
    /// Versions with the commit latch set
    pub committed_count: usize,
}

impl From<&StoreSnapshot> for SnapshotMetadata {
    fn from(snapshot: &StoreSnapshot) -> Self {
        Self {
            format_version: snapshot.format_version,
            project_count: snapshot.projects.len(),
            version_count: snapshot.versions.len(),
            container_count: snapshot.containers.len(),
            snippet_count: snapshot.snippets.len(),
            pull_request_count: snapshot.pull_requests.len(),
            committed_count: snapshot.versions.values().filter(|v| v.is_committed).count(),
        }
    }
}

impl MemoryStore {
    /// Copy the whole arena into a snapshot.
    pub fn export_state(&self) -> StoreSnapshot {
        StoreSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            projects: self.projects.iter().map(|(k, v)| (*k, v.clone())).collect(),
            versions: self.versions.iter().map(|(k, v)| (*k, v.clone())).collect(),
            memberships: self
                .memberships
                .iter()
                .map(|(k, v)| (*k, v.clone()))
                .collect(),
            containers: self
                .containers
                .iter()
                .map(|(k, v)| (*k, v.clone()))
                .collect(),
            snippets: self.snippets.iter().map(|(k, v)| (*k, v.clone())).collect(),
            pull_requests: self
                .pull_requests
                .iter()
                .map(|(k, v)| (*k, v.clone()))
                .collect(),
        }
    }

    /// Rebuild a store from a validated snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        snapshot.validate()?;
        Ok(Self {
            projects: snapshot.projects.into_iter().collect(),
            versions: snapshot.versions.into_iter().collect(),
            memberships: snapshot.memberships.into_iter().collect(),
            containers: snapshot.containers.into_iter().collect(),
            snippets: snapshot.snippets.into_iter().collect(),
            pull_requests: snapshot.pull_requests.into_iter().collect(),
        })
    }
}
