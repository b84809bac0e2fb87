//! Container and snippet routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use grove_engine::{
    Container, ContainerId, ContainerInput, ContainerNode, ProjectId, Snippet, SnippetId,
    SnippetInput, VersionId,
};

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{
    handle_create_container, handle_create_snippet, handle_delete_container,
    handle_delete_snippet, handle_get_container, handle_update_snippet,
};
use crate::AppState;

/// Create container and snippet routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{project_id}/versions/{version_id}/containers",
            post(create_container),
        )
        .route(
            "/projects/{project_id}/versions/{version_id}/containers/{container_id}",
            get(get_container).delete(delete_container),
        )
        .route(
            "/projects/{project_id}/versions/{version_id}/snippets",
            post(create_snippet),
        )
        .route(
            "/projects/{project_id}/versions/{version_id}/snippets/{snippet_id}",
            patch(update_snippet).delete(delete_snippet),
        )
}

/// GET /projects/{projectId}/versions/{versionId}/containers/{containerId}
async fn get_container(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project, version, container)): Path<(ProjectId, VersionId, ContainerId)>,
) -> Result<Json<ContainerNode>> {
    Ok(Json(
        handle_get_container(&state, auth.id(), project, version, container).await?,
    ))
}

/// POST /projects/{projectId}/versions/{versionId}/containers
async fn create_container(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project, version)): Path<(ProjectId, VersionId)>,
    Json(input): Json<ContainerInput>,
) -> Result<(StatusCode, Json<Container>)> {
    let container = handle_create_container(&state, auth.id(), project, version, input).await?;
    Ok((StatusCode::CREATED, Json(container)))
}

/// DELETE /projects/{projectId}/versions/{versionId}/containers/{containerId}
async fn delete_container(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project, version, container)): Path<(ProjectId, VersionId, ContainerId)>,
) -> Result<StatusCode> {
    handle_delete_container(&state, auth.id(), project, version, container).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /projects/{projectId}/versions/{versionId}/snippets
async fn create_snippet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project, version)): Path<(ProjectId, VersionId)>,
    Json(input): Json<SnippetInput>,
) -> Result<(StatusCode, Json<Snippet>)> {
    let snippet = handle_create_snippet(&state, auth.id(), project, version, input).await?;
    Ok((StatusCode::CREATED, Json(snippet)))
}

/// PATCH /projects/{projectId}/versions/{versionId}/snippets/{snippetId}
async fn update_snippet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project, version, snippet)): Path<(ProjectId, VersionId, SnippetId)>,
    Json(input): Json<SnippetInput>,
) -> Result<Json<Snippet>> {
    Ok(Json(
        handle_update_snippet(&state, auth.id(), project, version, snippet, input).await?,
    ))
}

/// DELETE /projects/{projectId}/versions/{versionId}/snippets/{snippetId}
async fn delete_snippet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project, version, snippet)): Path<(ProjectId, VersionId, SnippetId)>,
) -> Result<StatusCode> {
    handle_delete_snippet(&state, auth.id(), project, version, snippet).await?;
    Ok(StatusCode::NO_CONTENT)
}
