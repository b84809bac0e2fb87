//! Version lifecycle handlers.

use grove_engine::{
    ContainerId, DiffNode, DiffSummary, ProjectId, Version, VersionId, VersionInput, VersionTree,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::AppState;

/// Query parameters for branching a version.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVersionQuery {
    pub parent_version_id: VersionId,
}

/// Query parameters for recording a merge parent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeQuery {
    pub merge_parent_id: VersionId,
}

/// Query parameters for diffing against another version.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffQuery {
    pub diff_version_id: VersionId,
}

/// A diffed subtree with its totals.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResponse {
    #[serde(flatten)]
    pub node: DiffNode,
    pub summary: DiffSummary,
}

pub async fn handle_list_versions(
    state: &AppState,
    user: &str,
    project: ProjectId,
) -> Result<Vec<Version>> {
    state.read(|graph| graph.list_versions(user, &project)).await
}

pub async fn handle_create_version(
    state: &AppState,
    user: &str,
    project: ProjectId,
    query: CreateVersionQuery,
    input: VersionInput,
) -> Result<Version> {
    let version = state
        .mutate(|graph, now| {
            graph.create_version(user, &project, &query.parent_version_id, input, now)
        })
        .await?;
    tracing::info!(version = %version.id, parent = %query.parent_version_id, "Version created");
    Ok(version)
}

pub async fn handle_get_version(
    state: &AppState,
    user: &str,
    project: ProjectId,
    version: VersionId,
) -> Result<VersionTree> {
    state
        .read(|graph| graph.get_version_info(user, &project, &version))
        .await
}

pub async fn handle_history(
    state: &AppState,
    user: &str,
    project: ProjectId,
    version: VersionId,
) -> Result<Vec<Version>> {
    state
        .read(|graph| graph.history(user, &project, &version))
        .await
}

pub async fn handle_commit_version(
    state: &AppState,
    user: &str,
    project: ProjectId,
    version: VersionId,
) -> Result<()> {
    state
        .mutate(|graph, now| graph.commit_version(user, &project, &version, now))
        .await?;
    tracing::info!(%version, "Version committed");
    Ok(())
}

pub async fn handle_merge_version(
    state: &AppState,
    user: &str,
    project: ProjectId,
    version: VersionId,
    query: MergeQuery,
) -> Result<()> {
    state
        .mutate(|graph, now| {
            graph.merge_version(user, &project, &version, &query.merge_parent_id, now)
        })
        .await
}

pub async fn handle_diff_container(
    state: &AppState,
    user: &str,
    project: ProjectId,
    version: VersionId,
    container: ContainerId,
    query: DiffQuery,
) -> Result<DiffResponse> {
    let node = state
        .read(|graph| {
            graph.diff_container(user, &project, &version, &query.diff_version_id, &container)
        })
        .await?;
    Ok(DiffResponse {
        summary: node.summary(),
        node,
    })
}
