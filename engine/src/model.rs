//! Rows stored by the engine and the inputs that create them.
//!
//! Containers and snippets are immutable once inserted. Versions only change
//! through their commit latch, their merge parent and their `updated_at`.

use crate::{
    ContainerId, Indicator, ProjectId, PullRequestId, SnippetId, Timestamp, UserId, VersionId,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use uuid::Uuid;

/// A project: the unit of access control. Every version belongs to one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    /// Users allowed to read and edit every version of this project
    pub members: BTreeSet<UserId>,
    pub created_at: Timestamp,
}

impl Project {
    /// Create a project owned by `owner`. An empty description falls back to
    /// the name.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        owner: impl Into<UserId>,
        timestamp: Timestamp,
    ) -> Self {
        let name = name.into();
        let description = description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| name.clone());
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            members: BTreeSet::from([owner.into()]),
            created_at: timestamp,
        }
    }

    /// Check whether `user` belongs to this project.
    pub fn has_member(&self, user: &str) -> bool {
        self.members.contains(user)
    }
}

/// A version of a project's tree.
///
/// Which nodes a version contains is not stored here but in its
/// [`Membership`], owned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: VersionId,
    pub project_id: ProjectId,
    pub description: String,
    pub tag: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// One-way latch; once set, membership never changes again
    pub is_committed: bool,
    /// The version this one was branched from
    pub parent_id: Option<VersionId>,
    /// Second parent, recorded when this version represents a merge
    pub merge_parent_id: Option<VersionId>,
}

impl Version {
    /// Create the first version of a project.
    pub fn root(project_id: ProjectId, input: VersionInput, timestamp: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            description: input.description,
            tag: input.tag,
            created_at: timestamp,
            updated_at: timestamp,
            is_committed: false,
            parent_id: None,
            merge_parent_id: None,
        }
    }

    /// Create a version derived from `parent`.
    pub fn branch(parent: &Version, input: VersionInput, timestamp: Timestamp) -> Self {
        Self {
            parent_id: Some(parent.id),
            ..Self::root(parent.project_id, input, timestamp)
        }
    }

    /// Check if the version still accepts edits.
    pub fn is_open(&self) -> bool {
        !self.is_committed
    }
}

/// Per-version visibility sets.
///
/// `containers`/`snippets` hold everything reachable in the version; the
/// first-layer sets hold the subset that are roots of the version's tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub containers: BTreeSet<ContainerId>,
    pub snippets: BTreeSet<SnippetId>,
    pub first_layer_containers: BTreeSet<ContainerId>,
    pub first_layer_snippets: BTreeSet<SnippetId>,
}

impl Membership {
    /// Create empty membership.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_container(&self, id: &ContainerId) -> bool {
        self.containers.contains(id)
    }

    pub fn contains_snippet(&self, id: &SnippetId) -> bool {
        self.snippets.contains(id)
    }

    /// Total number of nodes visible in the version.
    pub fn len(&self) -> usize {
        self.containers.len() + self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty() && self.snippets.is_empty()
    }
}

/// A request to merge the version tagged `from_tag` into the one tagged
/// `to_tag`. Rows are immutable once opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub id: PullRequestId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: String,
    pub from_tag: String,
    pub to_tag: String,
    /// Member who opened the request
    pub author: UserId,
    pub created_at: Timestamp,
}

impl PullRequest {
    pub fn new(
        project_id: ProjectId,
        input: PullRequestInput,
        author: impl Into<UserId>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            title: input.title,
            description: input.description,
            from_tag: input.from_tag,
            to_tag: input.to_tag,
            author: author.into(),
            created_at: timestamp,
        }
    }
}

/// A folder-like node. Its `parent_id` is shared by every version that
/// contains it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: ContainerId,
    pub name: String,
    /// Position among siblings
    pub order: i64,
    pub parent_id: Option<ContainerId>,
    pub created_at: Timestamp,
}

impl Container {
    /// Create a new container row.
    pub fn new(input: ContainerInput, timestamp: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            order: input.order,
            parent_id: input.parent_id,
            created_at: timestamp,
        }
    }

    /// Sibling ordering: `order`, then name, then id.
    pub fn sibling_cmp(&self, other: &Container) -> Ordering {
        self.order
            .cmp(&other.order)
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// A leaf content node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub id: SnippetId,
    /// Identity shared by every revision of this snippet
    pub indicator: Indicator,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub order: f64,
    pub container_id: Option<ContainerId>,
    pub created_at: Timestamp,
}

impl Snippet {
    /// Create the first revision of a new logical snippet.
    pub fn new(input: SnippetInput, timestamp: Timestamp) -> Self {
        Self::with_indicator(Uuid::new_v4(), input, timestamp)
    }

    /// Create a new row that continues this snippet's identity.
    pub fn revise(&self, input: SnippetInput, timestamp: Timestamp) -> Self {
        Self::with_indicator(self.indicator, input, timestamp)
    }

    fn with_indicator(indicator: Indicator, input: SnippetInput, timestamp: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            indicator,
            content: input.content,
            kind: input.kind,
            order: input.order,
            container_id: input.container_id,
            created_at: timestamp,
        }
    }

    /// Check if two rows are revisions of the same logical snippet.
    pub fn same_identity(&self, other: &Snippet) -> bool {
        self.indicator == other.indicator
    }

    /// Sibling ordering: `order`, then indicator, then id.
    pub fn sibling_cmp(&self, other: &Snippet) -> Ordering {
        self.order
            .total_cmp(&other.order)
            .then_with(|| self.indicator.cmp(&other.indicator))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Fields for a new version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInput {
    pub description: String,
    #[serde(default)]
    pub tag: Option<String>,
}

impl VersionInput {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            tag: None,
        }
    }

    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Fields for a new container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInput {
    pub name: String,
    pub order: i64,
    /// Parent container; `None` makes the container a first-layer root
    #[serde(default)]
    pub parent_id: Option<ContainerId>,
}

impl ContainerInput {
    /// A first-layer container.
    pub fn root(name: impl Into<String>, order: i64) -> Self {
        Self {
            name: name.into(),
            order,
            parent_id: None,
        }
    }

    /// A container nested under `parent`.
    pub fn child(name: impl Into<String>, order: i64, parent: ContainerId) -> Self {
        Self {
            parent_id: Some(parent),
            ..Self::root(name, order)
        }
    }
}

/// Fields for a new snippet or a new snippet revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetInput {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub order: f64,
    /// Holding container; `None` makes the snippet a first-layer root
    #[serde(default)]
    pub container_id: Option<ContainerId>,
}

impl SnippetInput {
    /// A first-layer snippet.
    pub fn new(content: impl Into<String>, kind: impl Into<String>, order: f64) -> Self {
        Self {
            content: content.into(),
            kind: kind.into(),
            order,
            container_id: None,
        }
    }

    /// Place the snippet inside `container`.
    pub fn in_container(mut self, container: ContainerId) -> Self {
        self.container_id = Some(container);
        self
    }
}

/// Fields for a new pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub from_tag: String,
    pub to_tag: String,
}

impl PullRequestInput {
    pub fn new(
        title: impl Into<String>,
        from_tag: impl Into<String>,
        to_tag: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            from_tag: from_tag.into(),
            to_tag: to_tag.into(),
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn project_description_defaults_to_name() {
        let project = Project::new("notes", None, "alice", 1000);
        assert_eq!(project.description, "notes");
        assert!(project.has_member("alice"));
        assert!(!project.has_member("bob"));

        let project = Project::new("notes", Some("  ".into()), "alice", 1000);
        assert_eq!(project.description, "notes");

        let project = Project::new("notes", Some("my notes".into()), "alice", 1000);
        assert_eq!(project.description, "my notes");
    }

    #[test]
    fn branch_links_parent() {
        let project = Uuid::new_v4();
        let main = Version::root(project, VersionInput::new("First version").tagged("main"), 1000);
        let draft = Version::branch(&main, VersionInput::new("draft"), 2000);

        assert_eq!(draft.parent_id, Some(main.id));
        assert_eq!(draft.project_id, project);
        assert_ne!(draft.id, main.id);
        assert_eq!(draft.created_at, 2000);
        assert!(draft.is_open());
        assert_eq!(draft.merge_parent_id, None);
    }

    #[test]
    fn revise_keeps_indicator() {
        let first = Snippet::new(SnippetInput::new("hello", "text", 0.0), 1000);
        let second = first.revise(SnippetInput::new("hello v2", "text", 1.0), 2000);

        assert_ne!(first.id, second.id);
        assert!(first.same_identity(&second));
        assert_eq!(second.content, "hello v2");
        assert_eq!(first.content, "hello");
    }

    #[test]
    fn sibling_ordering() {
        let parent = Uuid::new_v4();
        let a = Container::new(ContainerInput::child("b", 0, parent), 1);
        let b = Container::new(ContainerInput::child("a", 1, parent), 1);
        let c = Container::new(ContainerInput::child("a", 0, parent), 1);

        let mut siblings = [&a, &b, &c];
        siblings.sort_by(|x, y| x.sibling_cmp(y));
        assert_eq!(siblings.map(|c| c.id), [c.id, a.id, b.id]);
    }

    #[test]
    fn snippet_wire_format() {
        let snippet = Snippet::new(SnippetInput::new("hi", "markdown", 2.5), 1000);
        let value = serde_json::to_value(&snippet).unwrap();
        assert_eq!(value["type"], json!("markdown"));
        assert_eq!(value["containerId"], json!(null));
        assert!(value.get("kind").is_none());

        let input: SnippetInput =
            serde_json::from_value(json!({"content": "x", "type": "code", "order": 1})).unwrap();
        assert_eq!(input.kind, "code");
        assert_eq!(input.order, 1.0);
        assert_eq!(input.container_id, None);
    }

    #[test]
    fn membership_counts() {
        let mut membership = Membership::new();
        assert!(membership.is_empty());
        let id = Uuid::new_v4();
        membership.containers.insert(id);
        assert!(membership.contains_container(&id));
        assert!(!membership.contains_snippet(&id));
        assert_eq!(membership.len(), 1);
    }

    #[test]
    fn pull_request_wire_format() {
        let input: PullRequestInput = serde_json::from_value(json!({
            "title": "Ship chapter two",
            "fromTag": "draft",
            "toTag": "main",
        }))
        .unwrap();
        assert_eq!(input, PullRequestInput::new("Ship chapter two", "draft", "main"));

        let pr = PullRequest::new(Uuid::nil(), input.described("ready"), "alice", 1000);
        let value = serde_json::to_value(&pr).unwrap();
        assert_eq!(value["fromTag"], "draft");
        assert_eq!(value["toTag"], "main");
        assert_eq!(value["description"], "ready");
        assert_eq!(value["author"], "alice");
    }
}
