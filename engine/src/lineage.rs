//! Version lineage: parent and merge-parent links between versions.

use crate::{NodeStore, Project, PullRequest, Version, VersionId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A version together with the versions derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionNode {
    #[serde(flatten)]
    pub version: Version,
    /// Versions branched from this one
    pub children: Vec<VersionId>,
    /// Versions that recorded this one as their merge parent
    pub merge_children: Vec<VersionId>,
}

/// A project with its whole version graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOverview {
    #[serde(flatten)]
    pub project: Project,
    /// Versions ordered by creation time
    pub versions: Vec<VersionNode>,
    /// Pull requests, oldest first
    pub pull_requests: Vec<PullRequest>,
}

/// Sort versions by creation time, ties broken by id.
pub fn chronological(mut versions: Vec<Version>) -> Vec<Version> {
    versions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    versions
}

/// Build the lineage view of a set of versions.
pub fn version_graph(versions: Vec<Version>) -> Vec<VersionNode> {
    let versions = chronological(versions);

    let mut children: HashMap<VersionId, Vec<VersionId>> = HashMap::new();
    let mut merge_children: HashMap<VersionId, Vec<VersionId>> = HashMap::new();
    for version in &versions {
        if let Some(parent) = version.parent_id {
            children.entry(parent).or_default().push(version.id);
        }
        if let Some(parent) = version.merge_parent_id {
            merge_children.entry(parent).or_default().push(version.id);
        }
    }

    versions
        .into_iter()
        .map(|version| VersionNode {
            children: children.remove(&version.id).unwrap_or_default(),
            merge_children: merge_children.remove(&version.id).unwrap_or_default(),
            version,
        })
        .collect()
}

/// First-parent ancestry of `start`, newest first, `start` included.
pub fn ancestry<S: NodeStore + ?Sized>(store: &S, start: &VersionId) -> Vec<Version> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = store.version(start);

    while let Some(version) = cursor {
        if !seen.insert(version.id) {
            break;
        }
        chain.push(version.clone());
        cursor = version.parent_id.as_ref().and_then(|p| store.version(p));
    }

    chain
}
