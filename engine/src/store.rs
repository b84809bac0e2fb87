//! Node Store - data access for projects, versions and tree rows.
//!
//! The store knows nothing about trees. It keeps rows in an arena keyed by id,
//! one [`Membership`] per version, and applies [`ChangeSet`]s atomically.

use crate::{
    access::AccessCheck, error::Result, Change, ChangeSet, Container, ContainerId, Error,
    Membership, NodeRef, Project, ProjectId, PullRequest, PullRequestId, Snippet, SnippetId,
    Version, VersionId,
};
use std::collections::{HashMap, HashSet};

/// Storage interface consumed by the engine.
///
/// Reads return borrowed rows. The only write is [`NodeStore::apply`], which
/// must either apply every change of the set or none of them, and must refuse
/// any membership change against a committed version.
pub trait NodeStore: AccessCheck {
    fn project(&self, id: &ProjectId) -> Option<&Project>;

    /// Projects `user` is a member of.
    fn projects_of(&self, user: &str) -> Vec<&Project>;

    fn version(&self, id: &VersionId) -> Option<&Version>;

    /// All versions of a project, in no particular order.
    fn versions_of(&self, project: &ProjectId) -> Vec<&Version>;

    fn membership(&self, version: &VersionId) -> Option<&Membership>;

    fn container(&self, id: &ContainerId) -> Option<&Container>;

    fn snippet(&self, id: &SnippetId) -> Option<&Snippet>;

    fn pull_request(&self, id: &PullRequestId) -> Option<&PullRequest>;

    /// All pull requests of a project, in no particular order.
    fn pull_requests_of(&self, project: &ProjectId) -> Vec<&PullRequest>;

    /// Apply a change set atomically.
    fn apply(&mut self, changes: &ChangeSet) -> Result<()>;
}

/// In-memory arena implementation of [`NodeStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub(crate) projects: HashMap<ProjectId, Project>,
    pub(crate) versions: HashMap<VersionId, Version>,
    pub(crate) memberships: HashMap<VersionId, Membership>,
    pub(crate) containers: HashMap<ContainerId, Container>,
    pub(crate) snippets: HashMap<SnippetId, Snippet>,
    pub(crate) pull_requests: HashMap<PullRequestId, PullRequest>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// Number of container rows, regardless of membership.
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// Number of snippet rows, regardless of membership.
    pub fn snippet_count(&self) -> usize {
        self.snippets.len()
    }

    pub fn pull_request_count(&self) -> usize {
        self.pull_requests.len()
    }

    /// Versions whose membership includes `snippet`.
    pub fn versions_with_snippet(&self, snippet: &SnippetId) -> Vec<VersionId> {
        let mut ids: Vec<_> = self
            .memberships
            .iter()
            .filter(|(_, m)| m.contains_snippet(snippet))
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Versions whose membership includes `container`.
    pub fn versions_with_container(&self, container: &ContainerId) -> Vec<VersionId> {
        let mut ids: Vec<_> = self
            .memberships
            .iter()
            .filter(|(_, m)| m.contains_container(container))
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Check a whole change set against current state without mutating.
    fn validate(&self, changes: &ChangeSet) -> Result<()> {
        let mut staged = Staged::default();

        for change in changes.iter() {
            match change {
                Change::InsertProject(project) => {
                    if self.projects.contains_key(&project.id)
                        || !staged.projects.insert(project.id)
                    {
                        return Err(reject(format!("duplicate project {}", project.id)));
                    }
                }
                Change::DescribeProject { project, .. }
                | Change::AddMember { project, .. }
                | Change::RemoveMember { project, .. } => {
                    self.require_project(&staged, project)?;
                }
                Change::InsertVersion {
                    version,
                    membership,
                } => {
                    if self.versions.contains_key(&version.id) || !staged.versions.insert(version.id)
                    {
                        return Err(reject(format!("duplicate version {}", version.id)));
                    }
                    self.require_project(&staged, &version.project_id)?;
                    if let Some(parent) = &version.parent_id {
                        self.require_version(&staged, parent)?;
                    }
                    for id in membership
                        .containers
                        .iter()
                        .chain(&membership.first_layer_containers)
                    {
                        self.require_container(&staged, id)?;
                    }
                    for id in membership
                        .snippets
                        .iter()
                        .chain(&membership.first_layer_snippets)
                    {
                        self.require_snippet(&staged, id)?;
                    }
                }
                Change::CommitVersion { version } => {
                    self.require_open(&staged, version)?;
                    staged.committed.insert(*version);
                }
                Change::SetMergeParent {
                    version,
                    merge_parent,
                } => {
                    self.require_version(&staged, version)?;
                    self.require_version(&staged, merge_parent)?;
                }
                Change::InsertContainer(container) => {
                    if self.containers.contains_key(&container.id)
                        || !staged.containers.insert(container.id)
                    {
                        return Err(reject(format!("duplicate container {}", container.id)));
                    }
                    if let Some(parent) = &container.parent_id {
                        self.require_container(&staged, parent)?;
                    }
                }
                Change::InsertSnippet(snippet) => {
                    if self.snippets.contains_key(&snippet.id)
                        || !staged.snippets.insert(snippet.id)
                    {
                        return Err(reject(format!("duplicate snippet {}", snippet.id)));
                    }
                    if let Some(container) = &snippet.container_id {
                        self.require_container(&staged, container)?;
                    }
                }
                Change::InsertPullRequest(pr) => {
                    if self.pull_requests.contains_key(&pr.id) {
                        return Err(reject(format!("duplicate pull request {}", pr.id)));
                    }
                    self.require_project(&staged, &pr.project_id)?;
                }
                Change::Connect { version, node, .. } | Change::Disconnect { version, node } => {
                    self.require_open(&staged, version)?;
                    match node {
                        NodeRef::Container(id) => self.require_container(&staged, id)?,
                        NodeRef::Snippet(id) => self.require_snippet(&staged, id)?,
                    }
                }
            }
        }

        Ok(())
    }

    fn require_project(&self, staged: &Staged, id: &ProjectId) -> Result<()> {
        if self.projects.contains_key(id) || staged.projects.contains(id) {
            Ok(())
        } else {
            Err(reject(format!("unknown project {id}")))
        }
    }

    fn require_version(&self, staged: &Staged, id: &VersionId) -> Result<()> {
        if self.versions.contains_key(id) || staged.versions.contains(id) {
            Ok(())
        } else {
            Err(reject(format!("unknown version {id}")))
        }
    }

    /// The commit latch re-check: evaluated at write time, not at request entry.
    fn require_open(&self, staged: &Staged, id: &VersionId) -> Result<()> {
        self.require_version(staged, id)?;
        let committed = staged.committed.contains(id)
            || self.versions.get(id).is_some_and(|v| v.is_committed);
        if committed {
            return Err(Error::VersionCommitted(*id));
        }
        Ok(())
    }

    fn require_container(&self, staged: &Staged, id: &ContainerId) -> Result<()> {
        if self.containers.contains_key(id) || staged.containers.contains(id) {
            Ok(())
        } else {
            Err(reject(format!("unknown container {id}")))
        }
    }

    fn require_snippet(&self, staged: &Staged, id: &SnippetId) -> Result<()> {
        if self.snippets.contains_key(id) || staged.snippets.contains(id) {
            Ok(())
        } else {
            Err(reject(format!("unknown snippet {id}")))
        }
    }

    /// Apply one change that has already been validated.
    fn write(&mut self, change: &Change) {
        match change {
            Change::InsertProject(project) => {
                self.projects.insert(project.id, project.clone());
            }
            Change::DescribeProject {
                project,
                description,
            } => {
                if let Some(project) = self.projects.get_mut(project) {
                    project.description = description.clone();
                }
            }
            Change::AddMember { project, user } => {
                if let Some(project) = self.projects.get_mut(project) {
                    project.members.insert(user.clone());
                }
            }
            Change::RemoveMember { project, user } => {
                if let Some(project) = self.projects.get_mut(project) {
                    project.members.remove(user);
                }
            }
            Change::InsertVersion {
                version,
                membership,
            } => {
                self.versions.insert(version.id, version.clone());
                self.memberships.insert(version.id, membership.clone());
            }
            Change::CommitVersion { version } => {
                if let Some(version) = self.versions.get_mut(version) {
                    version.is_committed = true;
                }
            }
            Change::SetMergeParent {
                version,
                merge_parent,
            } => {
                if let Some(version) = self.versions.get_mut(version) {
                    version.merge_parent_id = Some(*merge_parent);
                }
            }
            Change::InsertContainer(container) => {
                self.containers.insert(container.id, container.clone());
            }
            Change::InsertSnippet(snippet) => {
                self.snippets.insert(snippet.id, snippet.clone());
            }
            Change::InsertPullRequest(pr) => {
                self.pull_requests.insert(pr.id, pr.clone());
            }
            Change::Connect {
                version,
                node,
                first_layer,
            } => {
                let membership = self.memberships.entry(*version).or_default();
                match node {
                    NodeRef::Container(id) => {
                        membership.containers.insert(*id);
                        if *first_layer {
                            membership.first_layer_containers.insert(*id);
                        }
                    }
                    NodeRef::Snippet(id) => {
                        membership.snippets.insert(*id);
                        if *first_layer {
                            membership.first_layer_snippets.insert(*id);
                        }
                    }
                }
            }
            Change::Disconnect { version, node } => {
                if let Some(membership) = self.memberships.get_mut(version) {
                    match node {
                        NodeRef::Container(id) => {
                            membership.containers.remove(id);
                            membership.first_layer_containers.remove(id);
                        }
                        NodeRef::Snippet(id) => {
                            membership.snippets.remove(id);
                            membership.first_layer_snippets.remove(id);
                        }
                    }
                }
            }
        }
    }
}

/// Ids introduced earlier in the change set being validated.
#[derive(Default)]
struct Staged {
    projects: HashSet<ProjectId>,
    versions: HashSet<VersionId>,
    containers: HashSet<ContainerId>,
    snippets: HashSet<SnippetId>,
    committed: HashSet<VersionId>,
}

fn reject(reason: String) -> Error {
    Error::Store(reason)
}

impl AccessCheck for MemoryStore {
    fn is_member(&self, project: &ProjectId, user: &str) -> bool {
        self.projects
            .get(project)
            .is_some_and(|p| p.has_member(user))
    }
}

impl NodeStore for MemoryStore {
    fn project(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.get(id)
    }

    fn projects_of(&self, user: &str) -> Vec<&Project> {
        self.projects
            .values()
            .filter(|p| p.has_member(user))
            .collect()
    }

    fn version(&self, id: &VersionId) -> Option<&Version> {
        self.versions.get(id)
    }

    fn versions_of(&self, project: &ProjectId) -> Vec<&Version> {
        self.versions
            .values()
            .filter(|v| v.project_id == *project)
            .collect()
    }

    fn membership(&self, version: &VersionId) -> Option<&Membership> {
        self.memberships.get(version)
    }

    fn container(&self, id: &ContainerId) -> Option<&Container> {
        self.containers.get(id)
    }

    fn snippet(&self, id: &SnippetId) -> Option<&Snippet> {
        self.snippets.get(id)
    }

    fn pull_request(&self, id: &PullRequestId) -> Option<&PullRequest> {
        self.pull_requests.get(id)
    }

    fn pull_requests_of(&self, project: &ProjectId) -> Vec<&PullRequest> {
        self.pull_requests
            .values()
            .filter(|pr| pr.project_id == *project)
            .collect()
    }

    fn apply(&mut self, changes: &ChangeSet) -> Result<()> {
        self.validate(changes)?;

        for change in changes.iter() {
            self.write(change);
        }
        for id in changes.edited_versions() {
            if let Some(version) = self.versions.get_mut(&id) {
                version.updated_at = version.updated_at.max(changes.at);
            }
        }

        Ok(())
    }
}
