//! Structural diff of one container subtree across two versions.
//!
//! # Algorithm
//!
//! 1. Look the container up in both versions' views (same row id, different
//!    membership filters)
//! 2. Union the child containers by id
//! 3. Union the snippets by indicator; when both versions hold the same
//!    indicator the base version's revision represents it
//! 4. Tag every snippet with the version it was taken from and a
//!    [`DiffStatus`]
//! 5. Recurse into every child of the union
//!
//! This is a union/annotate diff. Concurrent edits of one indicator are
//! reported as [`DiffStatus::Modified`], never as conflicts.

use crate::{view::VersionView, Container, ContainerId, Indicator, Snippet, VersionId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// How a snippet differs between the base and the other version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DiffStatus {
    /// Both versions hold the same row
    Unchanged,
    /// Both versions hold a revision of the same snippet, but different rows
    Modified { other: Snippet },
    /// Only the base version holds this indicator
    OnlyInBase,
    /// Only the other version holds this indicator
    OnlyInOther,
}

/// A snippet in a diff, tagged with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSnippet {
    #[serde(flatten)]
    pub snippet: Snippet,
    /// Version the representative row was taken from
    pub version: VersionId,
    pub diff: DiffStatus,
}

/// A container in a diff with the union of both versions' contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffNode {
    #[serde(flatten)]
    pub container: Container,
    pub children: Vec<DiffNode>,
    pub snippets: Vec<DiffSnippet>,
}

/// Snippet counts per status across a diff subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub unchanged: usize,
    pub modified: usize,
    pub only_in_base: usize,
    pub only_in_other: usize,
}

impl DiffSummary {
    /// True if the two versions agree on every snippet in the subtree.
    pub fn is_identical(&self) -> bool {
        self.modified == 0 && self.only_in_base == 0 && self.only_in_other == 0
    }
}

impl DiffNode {
    /// Count snippets by status over the whole subtree.
    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        self.accumulate(&mut summary);
        summary
    }

    fn accumulate(&self, summary: &mut DiffSummary) {
        for snippet in &self.snippets {
            match snippet.diff {
                DiffStatus::Unchanged => summary.unchanged += 1,
                DiffStatus::Modified { .. } => summary.modified += 1,
                DiffStatus::OnlyInBase => summary.only_in_base += 1,
                DiffStatus::OnlyInOther => summary.only_in_other += 1,
            }
        }
        for child in &self.children {
            child.accumulate(summary);
        }
    }
}

/// Diff `container` between two views.
///
/// Returns `None` if the container is part of neither version.
pub fn diff_container(
    base: &VersionView<'_>,
    other: &VersionView<'_>,
    container: &ContainerId,
) -> Option<DiffNode> {
    let row = base.container(container).or_else(|| other.container(container))?;
    Some(assemble(base, other, row))
}

fn assemble(base: &VersionView<'_>, other: &VersionView<'_>, container: &Container) -> DiffNode {
    let mut seen = HashSet::new();
    let mut children: Vec<&Container> = base
        .children_of(&container.id)
        .iter()
        .chain(other.children_of(&container.id))
        .copied()
        .filter(|c| seen.insert(c.id))
        .collect();
    children.sort_by(|a, b| a.sibling_cmp(b));

    DiffNode {
        container: container.clone(),
        children: children
            .into_iter()
            .map(|child| assemble(base, other, child))
            .collect(),
        snippets: reconcile_snippets(base, other, &container.id),
    }
}

fn reconcile_snippets(
    base: &VersionView<'_>,
    other: &VersionView<'_>,
    container: &ContainerId,
) -> Vec<DiffSnippet> {
    let base_id = base.version().id;
    let other_id = other.version().id;

    let mut theirs: HashMap<Indicator, &Snippet> = HashMap::new();
    for snippet in other.snippets_of(container) {
        theirs.entry(snippet.indicator).or_insert(*snippet);
    }

    let mut merged = Vec::new();
    let mut taken = HashSet::new();
    for snippet in base.snippets_of(container) {
        if !taken.insert(snippet.indicator) {
            continue;
        }
        let diff = match theirs.get(&snippet.indicator) {
            Some(o) if o.id == snippet.id => DiffStatus::Unchanged,
            Some(o) => DiffStatus::Modified {
                other: (*o).clone(),
            },
            None => DiffStatus::OnlyInBase,
        };
        merged.push(DiffSnippet {
            snippet: (*snippet).clone(),
            version: base_id,
            diff,
        });
    }
    for snippet in other.snippets_of(container) {
        if taken.insert(snippet.indicator) {
            merged.push(DiffSnippet {
                snippet: (*snippet).clone(),
                version: other_id,
                diff: DiffStatus::OnlyInOther,
            });
        }
    }

    merged.sort_by(|a, b| a.snippet.sibling_cmp(&b.snippet));
    merged
}
