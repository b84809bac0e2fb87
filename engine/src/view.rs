//! In-memory projection of one version's tree.
//!
//! A [`VersionView`] is built from a single bulk read of the version's
//! membership. Children and snippets are indexed by parent container once, so
//! every later lookup is a map access instead of another store round trip.

use crate::{
    error::Result, Container, ContainerId, Error, Membership, NodeStore, Snippet, SnippetId,
    Version, VersionId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A container with its subtree as seen from one version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerNode {
    #[serde(flatten)]
    pub container: Container,
    pub children: Vec<ContainerNode>,
    pub snippets: Vec<Snippet>,
}

impl ContainerNode {
    /// Count containers in this subtree, including this one.
    pub fn container_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(ContainerNode::container_count)
            .sum::<usize>()
    }

    /// Count snippets in this subtree.
    pub fn snippet_count(&self) -> usize {
        self.snippets.len()
            + self
                .children
                .iter()
                .map(ContainerNode::snippet_count)
                .sum::<usize>()
    }
}

/// The full tree of a version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionTree {
    #[serde(flatten)]
    pub version: Version,
    /// First-layer containers, fully expanded
    pub containers: Vec<ContainerNode>,
    /// First-layer snippets
    pub snippets: Vec<Snippet>,
}

/// Read-only, indexed view of one version.
#[derive(Debug)]
pub struct VersionView<'s> {
    version: &'s Version,
    membership: &'s Membership,
    containers: HashMap<ContainerId, &'s Container>,
    snippets: HashMap<SnippetId, &'s Snippet>,
    children: HashMap<ContainerId, Vec<&'s Container>>,
    contents: HashMap<ContainerId, Vec<&'s Snippet>>,
}

impl<'s> VersionView<'s> {
    /// Load a version's rows and index them by parent.
    pub fn load<S: NodeStore + ?Sized>(store: &'s S, id: &VersionId) -> Result<Self> {
        let version = store
            .version(id)
            .ok_or_else(|| Error::Store(format!("unknown version {id}")))?;
        let membership = store
            .membership(id)
            .ok_or_else(|| Error::Store(format!("version {id} has no membership")))?;

        let mut containers = HashMap::with_capacity(membership.containers.len());
        let mut children: HashMap<ContainerId, Vec<&Container>> = HashMap::new();
        for cid in &membership.containers {
            let container = store
                .container(cid)
                .ok_or_else(|| Error::Store(format!("dangling container {cid} in version {id}")))?;
            containers.insert(*cid, container);
            if let Some(parent) = container.parent_id {
                children.entry(parent).or_default().push(container);
            }
        }

        let mut snippets = HashMap::with_capacity(membership.snippets.len());
        let mut contents: HashMap<ContainerId, Vec<&Snippet>> = HashMap::new();
        for sid in &membership.snippets {
            let snippet = store
                .snippet(sid)
                .ok_or_else(|| Error::Store(format!("dangling snippet {sid} in version {id}")))?;
            snippets.insert(*sid, snippet);
            if let Some(container) = snippet.container_id {
                contents.entry(container).or_default().push(snippet);
            }
        }

        for list in children.values_mut() {
            list.sort_by(|a, b| a.sibling_cmp(b));
        }
        for list in contents.values_mut() {
            list.sort_by(|a, b| a.sibling_cmp(b));
        }

        Ok(Self {
            version,
            membership,
            containers,
            snippets,
            children,
            contents,
        })
    }

    pub fn version(&self) -> &'s Version {
        self.version
    }

    pub fn membership(&self) -> &'s Membership {
        self.membership
    }

    /// A container, if it is part of this version.
    pub fn container(&self, id: &ContainerId) -> Option<&'s Container> {
        self.containers.get(id).copied()
    }

    /// A snippet, if it is part of this version.
    pub fn snippet(&self, id: &SnippetId) -> Option<&'s Snippet> {
        self.snippets.get(id).copied()
    }

    /// Child containers of `id` that are part of this version, sorted.
    pub fn children_of(&self, id: &ContainerId) -> &[&'s Container] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Snippets directly inside `id` that are part of this version, sorted.
    pub fn snippets_of(&self, id: &ContainerId) -> &[&'s Snippet] {
        self.contents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check that a container holds nothing in this version.
    pub fn is_empty_container(&self, id: &ContainerId) -> bool {
        self.children_of(id).is_empty() && self.snippets_of(id).is_empty()
    }

    /// First-layer containers, sorted.
    pub fn root_containers(&self) -> Vec<&'s Container> {
        let mut roots: Vec<_> = self
            .membership
            .first_layer_containers
            .iter()
            .filter_map(|id| self.container(id))
            .collect();
        roots.sort_by(|a, b| a.sibling_cmp(b));
        roots
    }

    /// First-layer snippets, sorted.
    pub fn root_snippets(&self) -> Vec<&'s Snippet> {
        let mut roots: Vec<_> = self
            .membership
            .first_layer_snippets
            .iter()
            .filter_map(|id| self.snippet(id))
            .collect();
        roots.sort_by(|a, b| a.sibling_cmp(b));
        roots
    }

    /// Expand one container's subtree. `None` if it is not part of the version.
    pub fn node(&self, id: &ContainerId) -> Option<ContainerNode> {
        self.container(id).map(|container| self.expand(container))
    }

    fn expand(&self, container: &Container) -> ContainerNode {
        ContainerNode {
            container: container.clone(),
            children: self
                .children_of(&container.id)
                .iter()
                .map(|child| self.expand(child))
                .collect(),
            snippets: self
                .snippets_of(&container.id)
                .iter()
                .map(|s| (*s).clone())
                .collect(),
        }
    }

    /// Assemble the whole tree.
    pub fn tree(&self) -> VersionTree {
        VersionTree {
            version: self.version.clone(),
            containers: self
                .root_containers()
                .into_iter()
                .map(|c| self.expand(c))
                .collect(),
            snippets: self.root_snippets().into_iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Change, ChangeSet, ContainerInput, MemoryStore, NodeRef, Project, SnippetInput,
        VersionInput,
    };

    struct Fixture {
        store: MemoryStore,
        version: Version,
        other: Version,
    }

    fn connect(set: &mut ChangeSet, version: VersionId, node: NodeRef, first_layer: bool) {
        set.push(Change::Connect {
            version,
            node,
            first_layer,
        });
    }

    /// `root` holds `a` (with snippet `s2`) and snippet `s1`; `other` shares
    /// only `root`.
    fn fixture() -> (Fixture, Container, Container, Snippet, Snippet) {
        let mut store = MemoryStore::new();
        let project = Project::new("p", None, "alice", 1);
        let version = Version::root(project.id, VersionInput::new("v"), 1);
        let other = Version::root(project.id, VersionInput::new("w"), 1);

        let root = Container::new(ContainerInput::root("root", 0), 1);
        let a = Container::new(ContainerInput::child("a", 0, root.id), 1);
        let s1 = Snippet::new(SnippetInput::new("one", "text", 1.0).in_container(root.id), 1);
        let s2 = Snippet::new(SnippetInput::new("two", "text", 0.0).in_container(a.id), 1);

        let mut set = ChangeSet::new(1)
            .with(Change::InsertProject(project))
            .with(Change::InsertVersion {
                version: version.clone(),
                membership: Membership::new(),
            })
            .with(Change::InsertVersion {
                version: other.clone(),
                membership: Membership::new(),
            })
            .with(Change::InsertContainer(root.clone()))
            .with(Change::InsertContainer(a.clone()))
            .with(Change::InsertSnippet(s1.clone()))
            .with(Change::InsertSnippet(s2.clone()));
        connect(&mut set, version.id, NodeRef::Container(root.id), true);
        connect(&mut set, version.id, NodeRef::Container(a.id), false);
        connect(&mut set, version.id, NodeRef::Snippet(s1.id), false);
        connect(&mut set, version.id, NodeRef::Snippet(s2.id), false);
        connect(&mut set, other.id, NodeRef::Container(root.id), true);
        store.apply(&set).unwrap();

        (
            Fixture {
                store,
                version,
                other,
            },
            root,
            a,
            s1,
            s2,
        )
    }

    #[test]
    fn tree_expands_recursively() {
        let (fx, root, a, s1, s2) = fixture();
        let view = VersionView::load(&fx.store, &fx.version.id).unwrap();
        let tree = view.tree();

        assert_eq!(tree.version.id, fx.version.id);
        assert_eq!(tree.containers.len(), 1);
        let node = &tree.containers[0];
        assert_eq!(node.container.id, root.id);
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.children[0].container.id, a.id);
        assert_eq!(node.children[0].snippets[0].id, s2.id);
        assert_eq!(node.snippets[0].id, s1.id);
        assert_eq!(node.container_count(), 2);
        assert_eq!(node.snippet_count(), 2);
        assert!(tree.snippets.is_empty());
    }

    #[test]
    fn children_filtered_by_membership() {
        let (fx, root, a, _, _) = fixture();
        let view = VersionView::load(&fx.store, &fx.other.id).unwrap();

        // `a` points at `root` globally but is not part of `other`.
        assert!(view.children_of(&root.id).is_empty());
        assert!(view.is_empty_container(&root.id));
        assert!(view.container(&a.id).is_none());
        assert!(view.node(&a.id).is_none());

        let node = view.node(&root.id).unwrap();
        assert!(node.children.is_empty());
        assert!(node.snippets.is_empty());
    }

    #[test]
    fn non_empty_container_detected() {
        let (fx, root, a, _, _) = fixture();
        let view = VersionView::load(&fx.store, &fx.version.id).unwrap();
        assert!(!view.is_empty_container(&root.id));
        assert!(!view.is_empty_container(&a.id));
    }

    #[test]
    fn tree_wire_format_is_flat() {
        let (fx, _, _, _, _) = fixture();
        let view = VersionView::load(&fx.store, &fx.version.id).unwrap();
        let value = serde_json::to_value(view.tree()).unwrap();

        assert_eq!(value["id"], serde_json::json!(fx.version.id));
        assert_eq!(value["isCommitted"], serde_json::json!(false));
        assert_eq!(value["containers"][0]["name"], serde_json::json!("root"));
        assert_eq!(
            value["containers"][0]["children"][0]["name"],
            serde_json::json!("a")
        );
    }

    #[test]
    fn unknown_version_is_a_store_failure() {
        let store = MemoryStore::new();
        let err = VersionView::load(&store, &uuid::Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }
}
