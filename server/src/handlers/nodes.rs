//! Container and snippet handlers.

use grove_engine::{
    Container, ContainerId, ContainerInput, ContainerNode, ProjectId, Snippet, SnippetId,
    SnippetInput, VersionId,
};

use crate::error::Result;
use crate::AppState;

pub async fn handle_get_container(
    state: &AppState,
    user: &str,
    project: ProjectId,
    version: VersionId,
    container: ContainerId,
) -> Result<ContainerNode> {
    state
        .read(|graph| graph.get_container(user, &project, &version, &container))
        .await
}

pub async fn handle_create_container(
    state: &AppState,
    user: &str,
    project: ProjectId,
    version: VersionId,
    input: ContainerInput,
) -> Result<Container> {
    state
        .mutate(|graph, now| graph.create_container(user, &project, &version, input, now))
        .await
}

pub async fn handle_delete_container(
    state: &AppState,
    user: &str,
    project: ProjectId,
    version: VersionId,
    container: ContainerId,
) -> Result<()> {
    state
        .mutate(|graph, now| graph.delete_container(user, &project, &version, &container, now))
        .await
}

pub async fn handle_create_snippet(
    state: &AppState,
    user: &str,
    project: ProjectId,
    version: VersionId,
    input: SnippetInput,
) -> Result<Snippet> {
    state
        .mutate(|graph, now| graph.create_snippet(user, &project, &version, input, now))
        .await
}

/// Copy-on-write edit: the response is the new row.
pub async fn handle_update_snippet(
    state: &AppState,
    user: &str,
    project: ProjectId,
    version: VersionId,
    snippet: SnippetId,
    input: SnippetInput,
) -> Result<Snippet> {
    let revised = state
        .mutate(|graph, now| graph.update_snippet(user, &project, &version, &snippet, input, now))
        .await?;
    tracing::debug!(old = %snippet, new = %revised.id, "Snippet revised");
    Ok(revised)
}

pub async fn handle_delete_snippet(
    state: &AppState,
    user: &str,
    project: ProjectId,
    version: VersionId,
    snippet: SnippetId,
) -> Result<()> {
    state
        .mutate(|graph, now| graph.delete_snippet(user, &project, &version, &snippet, now))
        .await
}
