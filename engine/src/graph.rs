//! The version graph engine.
//!
//! Every operation follows the same shape:
//!
//! 1. Authorize the requester against the project
//! 2. Resolve and validate every referenced row (check-then-act)
//! 3. Build one [`ChangeSet`]
//! 4. Hand it to [`NodeStore::apply`], which re-checks the commit latch and
//!    applies it atomically
//!
//! Rows are never mutated. Editing a snippet inserts a new row carrying the
//! old row's indicator and swaps the two in the target version's membership;
//! every other version keeps seeing the old row.

use crate::{
    access::authorize,
    diff::{self, DiffNode},
    error::Result,
    lineage::{self, ProjectOverview},
    view::{ContainerNode, VersionTree, VersionView},
    Change, ChangeSet, Container, ContainerId, ContainerInput, Error, Membership, NodeRef,
    NodeStore, Project, ProjectId, PullRequest, PullRequestId, PullRequestInput, Snippet,
    SnippetId, SnippetInput, Timestamp, Version, VersionId, VersionInput,
};

/// Description and tag given to the first version of every project.
const FIRST_VERSION_DESCRIPTION: &str = "First version";
const FIRST_VERSION_TAG: &str = "main";

/// The engine, generic over its storage.
#[derive(Debug, Clone, Default)]
pub struct VersionGraph<S> {
    store: S,
}

impl<S: NodeStore> VersionGraph<S> {
    /// Create an engine on top of a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Get the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the underlying store mutably. Writes made through it bypass every
    /// engine check.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consume the engine and return its store.
    pub fn into_store(self) -> S {
        self.store
    }

    // ------------------------------------------------------------------
    // Resolution helpers
    // ------------------------------------------------------------------

    /// Resolve a version under a project for a member.
    ///
    /// Unknown versions and versions of other projects are both reported as
    /// [`Error::ForeignVersion`] so existence is not leaked across projects.
    fn resolve_version(&self, user: &str, project: &ProjectId, id: &VersionId) -> Result<&Version> {
        authorize(&self.store, project, user)?;
        match self.store.version(id) {
            Some(version) if version.project_id == *project => Ok(version),
            _ => Err(Error::ForeignVersion {
                project: *project,
                version: *id,
            }),
        }
    }

    /// Resolve a version that must still accept edits.
    fn resolve_open(&self, user: &str, project: &ProjectId, id: &VersionId) -> Result<&Version> {
        let version = self.resolve_version(user, project, id)?;
        if version.is_committed {
            return Err(Error::VersionCommitted(*id));
        }
        Ok(version)
    }

    fn membership(&self, version: &VersionId) -> Result<&Membership> {
        self.store
            .membership(version)
            .ok_or_else(|| Error::Store(format!("version {version} has no membership")))
    }

    /// A container that new nodes may be attached to inside `version`.
    fn attachable(&self, version: &VersionId, container: &ContainerId) -> Result<()> {
        if self.store.container(container).is_none() {
            return Err(Error::ContainerNotFound(*container));
        }
        if !self.membership(version)?.contains_container(container) {
            return Err(Error::DetachedContainer {
                container: *container,
                version: *version,
            });
        }
        Ok(())
    }

    fn commit(&mut self, changes: ChangeSet) -> Result<()> {
        self.store.apply(&changes)
    }

    // ------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------

    /// Create a project owned by `user`, with its first "main" version.
    pub fn create_project(
        &mut self,
        user: &str,
        name: &str,
        description: Option<&str>,
        now: Timestamp,
    ) -> Result<(Project, Version)> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("project name must not be empty".into()));
        }

        let project = Project::new(name, description.map(str::to_string), user, now);
        let version = Version::root(
            project.id,
            VersionInput::new(FIRST_VERSION_DESCRIPTION).tagged(FIRST_VERSION_TAG),
            now,
        );

        self.commit(
            ChangeSet::new(now)
                .with(Change::InsertProject(project.clone()))
                .with(Change::InsertVersion {
                    version: version.clone(),
                    membership: Membership::new(),
                }),
        )?;

        tracing::debug!(project = %project.id, version = %version.id, user, "project created");
        Ok((project, version))
    }

    /// Projects `user` belongs to, oldest first.
    pub fn list_projects(&self, user: &str) -> Vec<Project> {
        let mut projects: Vec<Project> = self.store.projects_of(user).into_iter().cloned().collect();
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        projects
    }

    /// A project with its version lineage.
    pub fn get_project(&self, user: &str, project: &ProjectId) -> Result<ProjectOverview> {
        authorize(&self.store, project, user)?;
        let row = self
            .store
            .project(project)
            .ok_or_else(|| Error::Store(format!("member of unknown project {project}")))?;

        Ok(ProjectOverview {
            project: row.clone(),
            versions: lineage::version_graph(self.versions(project)),
            pull_requests: self.pull_requests(project),
        })
    }

    /// Replace a project's description.
    pub fn update_project(
        &mut self,
        user: &str,
        project: &ProjectId,
        description: &str,
        now: Timestamp,
    ) -> Result<()> {
        authorize(&self.store, project, user)?;
        if description.trim().is_empty() {
            return Err(Error::InvalidInput("description must not be empty".into()));
        }
        self.commit(ChangeSet::new(now).with(Change::DescribeProject {
            project: *project,
            description: description.to_string(),
        }))
    }

    /// Add `member` to the project. Users cannot add themselves.
    pub fn add_member(
        &mut self,
        user: &str,
        project: &ProjectId,
        member: &str,
        now: Timestamp,
    ) -> Result<()> {
        authorize(&self.store, project, user)?;
        if user == member {
            return Err(Error::OwnMembership(*project));
        }
        if member.trim().is_empty() {
            return Err(Error::InvalidInput("user id must not be empty".into()));
        }
        self.commit(ChangeSet::new(now).with(Change::AddMember {
            project: *project,
            user: member.to_string(),
        }))?;
        tracing::debug!(%project, member, "member added");
        Ok(())
    }

    /// Remove `member` from the project. Users cannot remove themselves.
    pub fn remove_member(
        &mut self,
        user: &str,
        project: &ProjectId,
        member: &str,
        now: Timestamp,
    ) -> Result<()> {
        authorize(&self.store, project, user)?;
        if user == member {
            return Err(Error::OwnMembership(*project));
        }
        self.commit(ChangeSet::new(now).with(Change::RemoveMember {
            project: *project,
            user: member.to_string(),
        }))?;
        tracing::debug!(%project, member, "member removed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Pull requests
    // ------------------------------------------------------------------

    fn pull_requests(&self, project: &ProjectId) -> Vec<PullRequest> {
        let mut prs: Vec<PullRequest> = self
            .store
            .pull_requests_of(project)
            .into_iter()
            .cloned()
            .collect();
        prs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        prs
    }

    /// Open a pull request between two version tags.
    ///
    /// Tags are free-form labels here; they are not resolved to versions.
    pub fn create_pull_request(
        &mut self,
        user: &str,
        project: &ProjectId,
        input: PullRequestInput,
        now: Timestamp,
    ) -> Result<PullRequest> {
        authorize(&self.store, project, user)?;
        if input.title.trim().is_empty() {
            return Err(Error::InvalidInput("pull request title must not be empty".into()));
        }
        if input.from_tag.trim().is_empty() || input.to_tag.trim().is_empty() {
            return Err(Error::InvalidInput("pull request tags must not be empty".into()));
        }

        let pr = PullRequest::new(*project, input, user, now);
        self.commit(ChangeSet::new(now).with(Change::InsertPullRequest(pr.clone())))?;

        tracing::debug!(
            %project,
            pull_request = %pr.id,
            from = %pr.from_tag,
            to = %pr.to_tag,
            "pull request opened"
        );
        Ok(pr)
    }

    /// A pull request of `project`. Requests of other projects are not found.
    pub fn get_pull_request(
        &self,
        user: &str,
        project: &ProjectId,
        id: &PullRequestId,
    ) -> Result<PullRequest> {
        authorize(&self.store, project, user)?;
        match self.store.pull_request(id) {
            Some(pr) if pr.project_id == *project => Ok(pr.clone()),
            _ => Err(Error::PullRequestNotFound(*id)),
        }
    }

    /// Pull requests of a project, oldest first.
    pub fn list_pull_requests(&self, user: &str, project: &ProjectId) -> Result<Vec<PullRequest>> {
        authorize(&self.store, project, user)?;
        Ok(self.pull_requests(project))
    }

    // ------------------------------------------------------------------
    // Versions
    // ------------------------------------------------------------------

    fn versions(&self, project: &ProjectId) -> Vec<Version> {
        lineage::chronological(
            self.store
                .versions_of(project)
                .into_iter()
                .cloned()
                .collect(),
        )
    }

    /// All versions of a project, oldest first.
    pub fn list_versions(&self, user: &str, project: &ProjectId) -> Result<Vec<Version>> {
        authorize(&self.store, project, user)?;
        Ok(self.versions(project))
    }

    /// First-parent ancestry of a version, newest first.
    pub fn history(&self, user: &str, project: &ProjectId, version: &VersionId) -> Result<Vec<Version>> {
        self.resolve_version(user, project, version)?;
        Ok(lineage::ancestry(&self.store, version))
    }

    /// Branch a new version from `parent`.
    ///
    /// The new version's membership sets are copies of the parent's id sets;
    /// no container or snippet row is duplicated. Branching twice from the
    /// same parent forks two independent siblings.
    pub fn create_version(
        &mut self,
        user: &str,
        project: &ProjectId,
        parent: &VersionId,
        input: VersionInput,
        now: Timestamp,
    ) -> Result<Version> {
        if input.description.trim().is_empty() {
            return Err(Error::InvalidInput("description must not be empty".into()));
        }
        let parent_row = self.resolve_version(user, project, parent)?;
        let membership = self.membership(parent)?.clone();
        let version = Version::branch(parent_row, input, now);

        self.commit(ChangeSet::new(now).with(Change::InsertVersion {
            version: version.clone(),
            membership,
        }))?;

        tracing::debug!(version = %version.id, %parent, "version branched");
        Ok(version)
    }

    /// Set the commit latch. Irreversible.
    pub fn commit_version(
        &mut self,
        user: &str,
        project: &ProjectId,
        version: &VersionId,
        now: Timestamp,
    ) -> Result<()> {
        self.resolve_open(user, project, version)?;
        self.commit(ChangeSet::new(now).with(Change::CommitVersion { version: *version }))?;
        tracing::debug!(%version, "version committed");
        Ok(())
    }

    /// Record `merge_parent` as the second parent of `version`.
    ///
    /// Lineage only: no content is reconciled here.
    pub fn merge_version(
        &mut self,
        user: &str,
        project: &ProjectId,
        version: &VersionId,
        merge_parent: &VersionId,
        now: Timestamp,
    ) -> Result<()> {
        self.resolve_version(user, project, version)?;
        self.resolve_version(user, project, merge_parent)?;
        if version == merge_parent {
            return Err(Error::SelfMerge(*version));
        }
        self.commit(ChangeSet::new(now).with(Change::SetMergeParent {
            version: *version,
            merge_parent: *merge_parent,
        }))?;
        tracing::debug!(%version, %merge_parent, "merge parent recorded");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tree edits
    // ------------------------------------------------------------------

    /// Create a container in `version`, as a root or under a parent that is
    /// part of the version.
    pub fn create_container(
        &mut self,
        user: &str,
        project: &ProjectId,
        version: &VersionId,
        input: ContainerInput,
        now: Timestamp,
    ) -> Result<Container> {
        self.resolve_open(user, project, version)?;
        if input.name.trim().is_empty() {
            return Err(Error::InvalidInput("container name must not be empty".into()));
        }
        if let Some(parent) = &input.parent_id {
            self.attachable(version, parent)?;
        }

        let container = Container::new(input, now);
        self.commit(
            ChangeSet::new(now)
                .with(Change::InsertContainer(container.clone()))
                .with(Change::Connect {
                    version: *version,
                    node: NodeRef::Container(container.id),
                    first_layer: container.parent_id.is_none(),
                }),
        )?;

        tracing::debug!(%version, container = %container.id, "container created");
        Ok(container)
    }

    /// Create a snippet with a fresh indicator.
    pub fn create_snippet(
        &mut self,
        user: &str,
        project: &ProjectId,
        version: &VersionId,
        input: SnippetInput,
        now: Timestamp,
    ) -> Result<Snippet> {
        self.resolve_open(user, project, version)?;
        if let Some(container) = &input.container_id {
            self.attachable(version, container)?;
        }

        let snippet = Snippet::new(input, now);
        self.commit(
            ChangeSet::new(now)
                .with(Change::InsertSnippet(snippet.clone()))
                .with(Change::Connect {
                    version: *version,
                    node: NodeRef::Snippet(snippet.id),
                    first_layer: snippet.container_id.is_none(),
                }),
        )?;

        tracing::debug!(%version, snippet = %snippet.id, "snippet created");
        Ok(snippet)
    }

    /// Copy-on-write edit of a snippet.
    ///
    /// Disconnects `existing` from `version` and connects a new row with the
    /// same indicator in one change set. `existing` stays visible in every
    /// other version that references it.
    pub fn update_snippet(
        &mut self,
        user: &str,
        project: &ProjectId,
        version: &VersionId,
        existing: &SnippetId,
        input: SnippetInput,
        now: Timestamp,
    ) -> Result<Snippet> {
        self.resolve_open(user, project, version)?;
        let old = self
            .store
            .snippet(existing)
            .ok_or(Error::SnippetNotFound(*existing))?;
        if !self.membership(version)?.contains_snippet(existing) {
            return Err(Error::SnippetNotInVersion {
                snippet: *existing,
                version: *version,
            });
        }
        if let Some(container) = &input.container_id {
            self.attachable(version, container)?;
        }

        let revised = old.revise(input, now);
        self.commit(
            ChangeSet::new(now)
                .with(Change::Disconnect {
                    version: *version,
                    node: NodeRef::Snippet(*existing),
                })
                .with(Change::InsertSnippet(revised.clone()))
                .with(Change::Connect {
                    version: *version,
                    node: NodeRef::Snippet(revised.id),
                    first_layer: revised.container_id.is_none(),
                }),
        )?;

        tracing::debug!(
            %version,
            old = %existing,
            new = %revised.id,
            indicator = %revised.indicator,
            "snippet revised"
        );
        Ok(revised)
    }

    /// Remove an empty container from `version`. The row is kept for other
    /// versions.
    pub fn delete_container(
        &mut self,
        user: &str,
        project: &ProjectId,
        version: &VersionId,
        container: &ContainerId,
        now: Timestamp,
    ) -> Result<()> {
        self.resolve_open(user, project, version)?;
        if self.store.container(container).is_none() {
            return Err(Error::ContainerNotFound(*container));
        }
        let (present, empty) = {
            let view = VersionView::load(&self.store, version)?;
            (
                view.container(container).is_some(),
                view.is_empty_container(container),
            )
        };
        if !present {
            return Err(Error::ContainerNotInVersion {
                container: *container,
                version: *version,
            });
        }
        if !empty {
            return Err(Error::ContainerNotEmpty(*container));
        }

        self.commit(ChangeSet::new(now).with(Change::Disconnect {
            version: *version,
            node: NodeRef::Container(*container),
        }))?;
        tracing::debug!(%version, %container, "container removed");
        Ok(())
    }

    /// Remove a snippet from `version`. The row is kept for other versions.
    pub fn delete_snippet(
        &mut self,
        user: &str,
        project: &ProjectId,
        version: &VersionId,
        snippet: &SnippetId,
        now: Timestamp,
    ) -> Result<()> {
        self.resolve_open(user, project, version)?;
        if self.store.snippet(snippet).is_none() {
            return Err(Error::SnippetNotFound(*snippet));
        }
        if !self.membership(version)?.contains_snippet(snippet) {
            return Err(Error::SnippetNotInVersion {
                snippet: *snippet,
                version: *version,
            });
        }

        self.commit(ChangeSet::new(now).with(Change::Disconnect {
            version: *version,
            node: NodeRef::Snippet(*snippet),
        }))?;
        tracing::debug!(%version, %snippet, "snippet removed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// The full tree of a version.
    pub fn get_version_info(
        &self,
        user: &str,
        project: &ProjectId,
        version: &VersionId,
    ) -> Result<VersionTree> {
        self.resolve_version(user, project, version)?;
        Ok(VersionView::load(&self.store, version)?.tree())
    }

    /// One container's subtree as seen from a version.
    pub fn get_container(
        &self,
        user: &str,
        project: &ProjectId,
        version: &VersionId,
        container: &ContainerId,
    ) -> Result<ContainerNode> {
        self.resolve_version(user, project, version)?;
        if self.store.container(container).is_none() {
            return Err(Error::ContainerNotFound(*container));
        }
        VersionView::load(&self.store, version)?
            .node(container)
            .ok_or(Error::ContainerNotInVersion {
                container: *container,
                version: *version,
            })
    }

    /// Union view of one container subtree across two versions.
    pub fn diff_container(
        &self,
        user: &str,
        project: &ProjectId,
        base: &VersionId,
        other: &VersionId,
        container: &ContainerId,
    ) -> Result<DiffNode> {
        self.resolve_version(user, project, base)?;
        self.resolve_version(user, project, other)?;
        if self.store.container(container).is_none() {
            return Err(Error::ContainerNotFound(*container));
        }

        let base_view = VersionView::load(&self.store, base)?;
        let other_view = VersionView::load(&self.store, other)?;
        diff::diff_container(&base_view, &other_view, container).ok_or(
            Error::ContainerNotInVersion {
                container: *container,
                version: *base,
            },
        )
    }
}
