//! # Grove Engine
//!
//! A copy-on-write version graph for hierarchical documents.
//!
//! A project is a tree of containers (folders) holding snippets (leaf
//! content). The tree is versioned: a new version shares every unchanged node
//! with the version it was derived from, and a committed version never
//! changes again.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine talks to storage only through [`NodeStore`]
//! - **Immutable rows**: containers and snippets are never mutated in place;
//!   an edit inserts a new row and rewires version membership
//! - **Atomic edits**: every logical edit is one [`ChangeSet`] that the store
//!   applies all-or-nothing
//! - **Deterministic projections**: trees and diffs are sorted explicitly, never
//!   by store iteration order
//!
//! ## Core Concepts
//!
//! ### Membership
//!
//! Rows live in an arena keyed by id. Each version owns a [`Membership`]: the
//! set of containers and snippets visible in it, plus the first-layer (root)
//! subsets. Parent/child pointers on rows are global; visibility is per version.
//!
//! ### Indicators
//!
//! Every revision of one logical snippet carries the same [`Indicator`]. Diffs
//! match snippets by indicator, never by row id.
//!
//! ### Diff
//!
//! [`diff::diff_container`] unions one container subtree as seen from two
//! versions and tags every snippet with a [`DiffStatus`].
//!
//! ## Quick Start
//!
//! ```rust
//! use grove_engine::{ContainerInput, MemoryStore, SnippetInput, VersionGraph, VersionInput};
//!
//! let mut graph = VersionGraph::new(MemoryStore::new());
//! let (project, main) = graph
//!     .create_project("alice", "notes", None, 1_000)
//!     .unwrap();
//!
//! let folder = graph
//!     .create_container("alice", &project.id, &main.id, ContainerInput::root("intro", 0), 1_001)
//!     .unwrap();
//! let snippet = graph
//!     .create_snippet(
//!         "alice",
//!         &project.id,
//!         &main.id,
//!         SnippetInput::new("hello", "text", 0.0).in_container(folder.id),
//!         1_002,
//!     )
//!     .unwrap();
//!
//! // Branch, then edit the snippet on the branch only.
//! let draft = graph
//!     .create_version("alice", &project.id, &main.id, VersionInput::new("draft"), 1_003)
//!     .unwrap();
//! let revised = graph
//!     .update_snippet(
//!         "alice",
//!         &project.id,
//!         &draft.id,
//!         &snippet.id,
//!         SnippetInput::new("hello v2", "text", 0.0).in_container(folder.id),
//!         1_004,
//!     )
//!     .unwrap();
//! assert_eq!(revised.indicator, snippet.indicator);
//!
//! let diff = graph
//!     .diff_container("alice", &project.id, &main.id, &draft.id, &folder.id)
//!     .unwrap();
//! assert_eq!(diff.snippets.len(), 1);
//! ```
//!
//! ## Persistence
//!
//! [`MemoryStore::export_state`] and [`MemoryStore::from_snapshot`] convert the
//! whole arena to and from a [`StoreSnapshot`] with deterministic ordering.

pub mod access;
pub mod change;
pub mod diff;
pub mod error;
pub mod graph;
pub mod lineage;
pub mod model;
pub mod snapshot;
pub mod store;
pub mod view;

// Re-export main types at crate root
pub use access::{authorize, AccessCheck};
pub use change::{Change, ChangeSet, NodeRef};
pub use diff::{DiffNode, DiffSnippet, DiffStatus, DiffSummary};
pub use error::{Error, ErrorKind};
pub use graph::VersionGraph;
pub use lineage::{ProjectOverview, VersionNode};
pub use model::{
    Container, ContainerInput, Membership, Project, PullRequest, PullRequestInput, Snippet,
    SnippetInput, Version, VersionInput,
};
pub use snapshot::{SnapshotMetadata, StoreSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use store::{MemoryStore, NodeStore};
pub use view::{ContainerNode, VersionTree, VersionView};

/// Type aliases for clarity
pub type ProjectId = uuid::Uuid;
pub type VersionId = uuid::Uuid;
pub type ContainerId = uuid::Uuid;
pub type SnippetId = uuid::Uuid;
pub type Indicator = uuid::Uuid;
pub type PullRequestId = uuid::Uuid;
pub type UserId = String;
pub type Timestamp = u64;
