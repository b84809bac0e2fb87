//! Version routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use grove_engine::{ContainerId, ProjectId, Version, VersionId, VersionInput, VersionTree};

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{
    handle_commit_version, handle_create_version, handle_diff_container, handle_get_version,
    handle_history, handle_list_versions, handle_merge_version, CreateVersionQuery, DiffQuery,
    DiffResponse, MergeQuery,
};
use crate::AppState;

/// Create version routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{project_id}/versions",
            get(list_versions).post(create_version),
        )
        .route("/projects/{project_id}/versions/{version_id}", get(get_version))
        .route(
            "/projects/{project_id}/versions/{version_id}/history",
            get(history),
        )
        .route(
            "/projects/{project_id}/versions/{version_id}/commit",
            post(commit_version),
        )
        .route(
            "/projects/{project_id}/versions/{version_id}/merge",
            post(merge_version),
        )
        .route(
            "/projects/{project_id}/versions/{version_id}/diff/containers/{container_id}",
            post(diff_container),
        )
}

/// GET /projects/{projectId}/versions
async fn list_versions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project): Path<ProjectId>,
) -> Result<Json<Vec<Version>>> {
    Ok(Json(handle_list_versions(&state, auth.id(), project).await?))
}

/// POST /projects/{projectId}/versions?parentVersionId=
async fn create_version(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project): Path<ProjectId>,
    Query(query): Query<CreateVersionQuery>,
    Json(input): Json<VersionInput>,
) -> Result<(StatusCode, Json<Version>)> {
    let version = handle_create_version(&state, auth.id(), project, query, input).await?;
    Ok((StatusCode::CREATED, Json(version)))
}

/// GET /projects/{projectId}/versions/{versionId}
async fn get_version(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project, version)): Path<(ProjectId, VersionId)>,
) -> Result<Json<VersionTree>> {
    Ok(Json(
        handle_get_version(&state, auth.id(), project, version).await?,
    ))
}

/// GET /projects/{projectId}/versions/{versionId}/history
async fn history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project, version)): Path<(ProjectId, VersionId)>,
) -> Result<Json<Vec<Version>>> {
    Ok(Json(handle_history(&state, auth.id(), project, version).await?))
}

/// POST /projects/{projectId}/versions/{versionId}/commit
async fn commit_version(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project, version)): Path<(ProjectId, VersionId)>,
) -> Result<StatusCode> {
    handle_commit_version(&state, auth.id(), project, version).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /projects/{projectId}/versions/{versionId}/merge?mergeParentId=
async fn merge_version(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project, version)): Path<(ProjectId, VersionId)>,
    Query(query): Query<MergeQuery>,
) -> Result<StatusCode> {
    handle_merge_version(&state, auth.id(), project, version, query).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /projects/{projectId}/versions/{versionId}/diff/containers/{containerId}?diffVersionId=
async fn diff_container(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project, version, container)): Path<(ProjectId, VersionId, ContainerId)>,
    Query(query): Query<DiffQuery>,
) -> Result<Json<DiffResponse>> {
    Ok(Json(
        handle_diff_container(&state, auth.id(), project, version, container, query).await?,
    ))
}
