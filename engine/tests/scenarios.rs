//! End-to-end scenarios for grove-engine
//!
//! These tests drive the engine only through `VersionGraph`, the way a
//! service would.

use grove_engine::{
    ContainerInput, DiffStatus, Error, ErrorKind, MemoryStore, NodeStore, ProjectId,
    PullRequestInput, SnippetInput, VersionGraph, VersionId, VersionInput,
};
use proptest::prelude::*;

const ALICE: &str = "alice";

fn project() -> (VersionGraph<MemoryStore>, ProjectId, VersionId) {
    let mut graph = VersionGraph::new(MemoryStore::new());
    let (project, main) = graph.create_project(ALICE, "book", None, 1000).unwrap();
    (graph, project.id, main.id)
}

// ============================================================================
// Copy-on-write
// ============================================================================

#[test]
fn branch_edit_and_diff() {
    let (mut graph, project, a) = project();

    let x = graph
        .create_container(ALICE, &project, &a, ContainerInput::root("X", 0), 1001)
        .unwrap();
    let s1 = graph
        .create_snippet(
            ALICE,
            &project,
            &a,
            SnippetInput::new("first draft", "text", 0.0).in_container(x.id),
            1002,
        )
        .unwrap();

    let b = graph
        .create_version(ALICE, &project, &a, VersionInput::new("B"), 1003)
        .unwrap();
    let s2 = graph
        .update_snippet(
            ALICE,
            &project,
            &b.id,
            &s1.id,
            SnippetInput::new("second draft", "text", 0.0).in_container(x.id),
            1004,
        )
        .unwrap();

    assert_ne!(s1.id, s2.id);
    assert_eq!(s1.indicator, s2.indicator);

    let diff = graph
        .diff_container(ALICE, &project, &a, &b.id, &x.id)
        .unwrap();
    assert_eq!(diff.snippets.len(), 1);
    let entry = &diff.snippets[0];
    assert_eq!(entry.snippet.id, s1.id);
    assert_eq!(entry.version, a);
    match &entry.diff {
        DiffStatus::Modified { other } => assert_eq!(other.id, s2.id),
        status => panic!("expected a modification, got {status:?}"),
    }

    // Both rows survive; each version sees its own.
    let store = graph.store();
    assert!(store.snippet(&s1.id).is_some());
    assert!(store.snippet(&s2.id).is_some());
    assert!(store.membership(&a).unwrap().contains_snippet(&s1.id));
    assert!(!store.membership(&a).unwrap().contains_snippet(&s2.id));
    assert!(store.membership(&b.id).unwrap().contains_snippet(&s2.id));
    assert!(!store.membership(&b.id).unwrap().contains_snippet(&s1.id));
}

#[test]
fn edits_never_leak_into_siblings() {
    let (mut graph, project, main) = project();
    let root = graph
        .create_container(ALICE, &project, &main, ContainerInput::root("root", 0), 1001)
        .unwrap();
    let shared = graph
        .create_snippet(
            ALICE,
            &project,
            &main,
            SnippetInput::new("shared", "text", 0.0).in_container(root.id),
            1002,
        )
        .unwrap();

    let left = graph
        .create_version(ALICE, &project, &main, VersionInput::new("left"), 1003)
        .unwrap();
    let right = graph
        .create_version(ALICE, &project, &main, VersionInput::new("right"), 1004)
        .unwrap();

    graph
        .delete_snippet(ALICE, &project, &left.id, &shared.id, 1005)
        .unwrap();
    graph
        .create_snippet(
            ALICE,
            &project,
            &right.id,
            SnippetInput::new("right only", "text", 1.0).in_container(root.id),
            1006,
        )
        .unwrap();

    let main_tree = graph.get_version_info(ALICE, &project, &main).unwrap();
    let left_tree = graph.get_version_info(ALICE, &project, &left.id).unwrap();
    let right_tree = graph.get_version_info(ALICE, &project, &right.id).unwrap();

    assert_eq!(main_tree.containers[0].snippets.len(), 1);
    assert!(left_tree.containers[0].snippets.is_empty());
    assert_eq!(right_tree.containers[0].snippets.len(), 2);
}

#[test]
fn branch_shares_rows() {
    let (mut graph, project, main) = project();
    let root = graph
        .create_container(ALICE, &project, &main, ContainerInput::root("root", 0), 1001)
        .unwrap();
    for i in 0..5 {
        graph
            .create_snippet(
                ALICE,
                &project,
                &main,
                SnippetInput::new(format!("s{i}"), "text", i as f64).in_container(root.id),
                1002 + i,
            )
            .unwrap();
    }

    let rows_before = graph.store().snippet_count() + graph.store().container_count();
    let branch = graph
        .create_version(ALICE, &project, &main, VersionInput::new("branch"), 2000)
        .unwrap();
    let rows_after = graph.store().snippet_count() + graph.store().container_count();

    assert_eq!(rows_before, rows_after);
    assert_eq!(
        graph.get_version_info(ALICE, &project, &main).unwrap().containers,
        graph
            .get_version_info(ALICE, &project, &branch.id)
            .unwrap()
            .containers
    );
}

// ============================================================================
// Commit latch
// ============================================================================

#[test]
fn committed_version_rejects_every_edit() {
    let (mut graph, project, main) = project();
    let root = graph
        .create_container(ALICE, &project, &main, ContainerInput::root("root", 0), 1001)
        .unwrap();
    let snippet = graph
        .create_snippet(
            ALICE,
            &project,
            &main,
            SnippetInput::new("x", "text", 0.0).in_container(root.id),
            1002,
        )
        .unwrap();
    graph.commit_version(ALICE, &project, &main, 1003).unwrap();
    let before = graph.store().membership(&main).cloned();

    let results = [
        graph
            .create_container(ALICE, &project, &main, ContainerInput::root("y", 1), 1004)
            .map(|_| ()),
        graph
            .create_snippet(ALICE, &project, &main, SnippetInput::new("y", "text", 0.0), 1004)
            .map(|_| ()),
        graph
            .update_snippet(
                ALICE,
                &project,
                &main,
                &snippet.id,
                SnippetInput::new("z", "text", 0.0).in_container(root.id),
                1004,
            )
            .map(|_| ()),
        graph.delete_snippet(ALICE, &project, &main, &snippet.id, 1004),
        graph.delete_container(ALICE, &project, &main, &root.id, 1004),
    ];

    for result in results {
        assert_eq!(result.unwrap_err(), Error::VersionCommitted(main));
    }
    assert_eq!(graph.store().membership(&main).cloned(), before);
    assert_eq!(graph.store().snippet_count(), 1);
}

#[test]
fn store_rechecks_latch_on_apply() {
    use grove_engine::{Change, ChangeSet, NodeRef};

    let (mut graph, project, main) = project();
    let snippet = graph
        .create_snippet(ALICE, &project, &main, SnippetInput::new("x", "text", 0.0), 1001)
        .unwrap();
    graph.commit_version(ALICE, &project, &main, 1002).unwrap();

    // Bypass the engine: the store itself must refuse.
    let set = ChangeSet::new(1003).with(Change::Disconnect {
        version: main,
        node: NodeRef::Snippet(snippet.id),
    });
    let err = graph.store_mut().apply(&set).unwrap_err();
    assert_eq!(err, Error::VersionCommitted(main));
    assert!(graph
        .store()
        .membership(&main)
        .unwrap()
        .contains_snippet(&snippet.id));

    // Unknown rows are a store failure.
    let set = ChangeSet::new(1004).with(Change::InsertContainer(grove_engine::Container::new(
        ContainerInput::child("orphan", 0, uuid::Uuid::new_v4()),
        1004,
    )));
    let err = graph.store_mut().apply(&set).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StoreFailure);
}

// ============================================================================
// Delete guard
// ============================================================================

#[test]
fn non_empty_container_cannot_be_deleted() {
    let (mut graph, project, main) = project();
    let root = graph
        .create_container(ALICE, &project, &main, ContainerInput::root("root", 0), 1001)
        .unwrap();
    let child = graph
        .create_container(
            ALICE,
            &project,
            &main,
            ContainerInput::child("child", 0, root.id),
            1002,
        )
        .unwrap();

    assert_eq!(
        graph
            .delete_container(ALICE, &project, &main, &root.id, 1003)
            .unwrap_err(),
        Error::ContainerNotEmpty(root.id)
    );

    graph
        .delete_container(ALICE, &project, &main, &child.id, 1004)
        .unwrap();
    graph
        .delete_container(ALICE, &project, &main, &root.id, 1005)
        .unwrap();

    let tree = graph.get_version_info(ALICE, &project, &main).unwrap();
    assert!(tree.containers.is_empty());
    // Rows stay in the arena.
    assert_eq!(graph.store().container_count(), 2);
}

#[test]
fn container_emptied_on_branch_only() {
    let (mut graph, project, main) = project();
    let root = graph
        .create_container(ALICE, &project, &main, ContainerInput::root("root", 0), 1001)
        .unwrap();
    let snippet = graph
        .create_snippet(
            ALICE,
            &project,
            &main,
            SnippetInput::new("x", "text", 0.0).in_container(root.id),
            1002,
        )
        .unwrap();
    let branch = graph
        .create_version(ALICE, &project, &main, VersionInput::new("branch"), 1003)
        .unwrap();

    graph
        .delete_snippet(ALICE, &project, &branch.id, &snippet.id, 1004)
        .unwrap();
    graph
        .delete_container(ALICE, &project, &branch.id, &root.id, 1005)
        .unwrap();

    assert_eq!(
        graph
            .delete_container(ALICE, &project, &main, &root.id, 1006)
            .unwrap_err(),
        Error::ContainerNotEmpty(root.id)
    );
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn siblings_sorted_by_order_then_name() {
    let (mut graph, project, main) = project();
    for (name, order) in [("c", 1), ("b", 0), ("a", 1)] {
        graph
            .create_container(ALICE, &project, &main, ContainerInput::root(name, order), 1001)
            .unwrap();
    }
    for (content, order) in [("late", 2.5), ("early", -1.0), ("middle", 0.5)] {
        graph
            .create_snippet(ALICE, &project, &main, SnippetInput::new(content, "text", order), 1002)
            .unwrap();
    }

    let tree = graph.get_version_info(ALICE, &project, &main).unwrap();
    let names: Vec<_> = tree.containers.iter().map(|c| c.container.name.as_str()).collect();
    assert_eq!(names, vec!["b", "a", "c"]);
    let contents: Vec<_> = tree.snippets.iter().map(|s| s.content.as_str()).collect();
    assert_eq!(contents, vec!["early", "middle", "late"]);
}

// ============================================================================
// Diff
// ============================================================================

#[test]
fn diff_unions_nested_containers() {
    let (mut graph, project, main) = project();
    let root = graph
        .create_container(ALICE, &project, &main, ContainerInput::root("root", 0), 1001)
        .unwrap();
    let branch = graph
        .create_version(ALICE, &project, &main, VersionInput::new("branch"), 1002)
        .unwrap();

    let only_main = graph
        .create_container(
            ALICE,
            &project,
            &main,
            ContainerInput::child("main side", 0, root.id),
            1003,
        )
        .unwrap();
    let only_branch = graph
        .create_container(
            ALICE,
            &project,
            &branch.id,
            ContainerInput::child("branch side", 1, root.id),
            1004,
        )
        .unwrap();
    graph
        .create_snippet(
            ALICE,
            &project,
            &branch.id,
            SnippetInput::new("nested", "text", 0.0).in_container(only_branch.id),
            1005,
        )
        .unwrap();

    let diff = graph
        .diff_container(ALICE, &project, &main, &branch.id, &root.id)
        .unwrap();
    let children: Vec<_> = diff.children.iter().map(|c| c.container.id).collect();
    assert_eq!(children, vec![only_main.id, only_branch.id]);
    assert_eq!(diff.children[1].snippets[0].diff, DiffStatus::OnlyInOther);
    assert_eq!(diff.children[1].snippets[0].version, branch.id);

    let summary = diff.summary();
    assert_eq!(summary.only_in_other, 1);
    assert!(!summary.is_identical());
}

#[test]
fn diff_across_projects_forbidden() {
    let (mut graph, project, main) = project();
    let (_, foreign) = graph.create_project(ALICE, "other", None, 1001).unwrap();
    let root = graph
        .create_container(ALICE, &project, &main, ContainerInput::root("root", 0), 1002)
        .unwrap();

    let err = graph
        .diff_container(ALICE, &project, &main, &foreign.id, &root.id)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

// ============================================================================
// Pull requests
// ============================================================================

#[test]
fn pull_request_review_then_merge() {
    let (mut graph, project, main) = project();
    let chapter = graph
        .create_container(ALICE, &project, &main, ContainerInput::root("chapter", 0), 1001)
        .unwrap();
    let intro = graph
        .create_snippet(
            ALICE,
            &project,
            &main,
            SnippetInput::new("intro", "text", 0.0).in_container(chapter.id),
            1002,
        )
        .unwrap();
    let draft = graph
        .create_version(
            ALICE,
            &project,
            &main,
            VersionInput::new("rewrite").tagged("draft"),
            1003,
        )
        .unwrap();
    graph
        .update_snippet(
            ALICE,
            &project,
            &draft.id,
            &intro.id,
            SnippetInput::new("a better intro", "text", 0.0).in_container(chapter.id),
            1004,
        )
        .unwrap();

    let pr = graph
        .create_pull_request(
            ALICE,
            &project,
            PullRequestInput::new("Rewrite the intro", "draft", "main"),
            1005,
        )
        .unwrap();

    // Resolve the request's tags the way a reviewer would.
    let versions = graph.list_versions(ALICE, &project).unwrap();
    let by_tag = |tag: &str| {
        versions
            .iter()
            .find(|v| v.tag.as_deref() == Some(tag))
            .map(|v| v.id)
            .unwrap()
    };
    let (to, from) = (by_tag(pr.to_tag.as_str()), by_tag(pr.from_tag.as_str()));
    assert_eq!((to, from), (main, draft.id));

    let diff = graph
        .diff_container(ALICE, &project, &to, &from, &chapter.id)
        .unwrap();
    assert_eq!(diff.summary().modified, 1);

    graph.merge_version(ALICE, &project, &to, &from, 1006).unwrap();
    let overview = graph.get_project(ALICE, &project).unwrap();
    assert_eq!(overview.pull_requests.len(), 1);
    let merged = overview
        .versions
        .iter()
        .find(|n| n.version.id == main)
        .unwrap();
    assert_eq!(merged.version.merge_parent_id, Some(draft.id));
    assert_eq!(merged.version.updated_at, 1006);
}

// ============================================================================
// Properties
// ============================================================================

/// Build a project whose main version holds `roots` containers, each with
/// the given number of snippets.
fn populated(layout: &[usize]) -> (VersionGraph<MemoryStore>, ProjectId, VersionId, Vec<uuid::Uuid>) {
    let (mut graph, project, main) = project();
    let mut roots = Vec::new();
    for (i, count) in layout.iter().enumerate() {
        let root = graph
            .create_container(
                ALICE,
                &project,
                &main,
                ContainerInput::root(format!("c{i}"), i as i64),
                1001,
            )
            .unwrap();
        for j in 0..*count {
            graph
                .create_snippet(
                    ALICE,
                    &project,
                    &main,
                    SnippetInput::new(format!("{i}/{j}"), "text", j as f64).in_container(root.id),
                    1002,
                )
                .unwrap();
        }
        roots.push(root.id);
    }
    (graph, project, main, roots)
}

proptest! {
    #[test]
    fn prop_branch_equals_parent(layout in prop::collection::vec(0usize..6, 0..5)) {
        let (mut graph, project, main, _) = populated(&layout);
        let branch = graph
            .create_version(ALICE, &project, &main, VersionInput::new("branch"), 2000)
            .unwrap();

        let parent_tree = graph.get_version_info(ALICE, &project, &main).unwrap();
        let branch_tree = graph.get_version_info(ALICE, &project, &branch.id).unwrap();
        prop_assert_eq!(parent_tree.containers, branch_tree.containers);
        prop_assert_eq!(parent_tree.snippets, branch_tree.snippets);
        prop_assert_eq!(
            graph.store().membership(&main),
            graph.store().membership(&branch.id)
        );
    }

    #[test]
    fn prop_self_diff_is_unchanged(layout in prop::collection::vec(0usize..6, 1..5)) {
        let (graph, project, main, roots) = populated(&layout);
        for root in &roots {
            let diff = graph.diff_container(ALICE, &project, &main, &main, root).unwrap();
            let node = graph.get_container(ALICE, &project, &main, root).unwrap();

            prop_assert_eq!(diff.snippets.len(), node.snippets.len());
            for (entry, snippet) in diff.snippets.iter().zip(&node.snippets) {
                prop_assert_eq!(&entry.snippet, snippet);
                prop_assert_eq!(&entry.diff, &DiffStatus::Unchanged);
                prop_assert_eq!(entry.version, main);
            }
            prop_assert!(diff.summary().is_identical());
        }
    }

    #[test]
    fn prop_disjoint_indicators_concatenate(base in 0usize..6, other in 0usize..6) {
        let (mut graph, project, main) = project();
        let root = graph
            .create_container(ALICE, &project, &main, ContainerInput::root("root", 0), 1001)
            .unwrap();
        let branch = graph
            .create_version(ALICE, &project, &main, VersionInput::new("branch"), 1002)
            .unwrap();

        for i in 0..base {
            graph
                .create_snippet(
                    ALICE,
                    &project,
                    &main,
                    SnippetInput::new("base", "text", i as f64).in_container(root.id),
                    1003,
                )
                .unwrap();
        }
        for i in 0..other {
            graph
                .create_snippet(
                    ALICE,
                    &project,
                    &branch.id,
                    SnippetInput::new("other", "text", i as f64).in_container(root.id),
                    1004,
                )
                .unwrap();
        }

        let diff = graph
            .diff_container(ALICE, &project, &main, &branch.id, &root.id)
            .unwrap();
        prop_assert_eq!(diff.snippets.len(), base + other);

        let summary = diff.summary();
        prop_assert_eq!(summary.only_in_base, base);
        prop_assert_eq!(summary.only_in_other, other);
        prop_assert_eq!(summary.modified, 0);
    }
}
