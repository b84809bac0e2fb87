//! Project routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use grove_engine::{
    Project, ProjectId, ProjectOverview, PullRequest, PullRequestId, PullRequestInput,
};

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{
    handle_add_member, handle_create_project, handle_create_pull_request, handle_get_project,
    handle_get_pull_request, handle_list_projects, handle_list_pull_requests, handle_remove_member,
    handle_update_project, AddMemberRequest, CreateProjectRequest, CreateProjectResponse,
    UpdateProjectRequest,
};
use crate::AppState;

/// Create project routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{project_id}",
            get(get_project).patch(update_project),
        )
        .route("/projects/{project_id}/members", post(add_member))
        .route(
            "/projects/{project_id}/members/{user_id}",
            delete(remove_member),
        )
        .route(
            "/projects/{project_id}/pullrequests",
            get(list_pull_requests).post(create_pull_request),
        )
        .route(
            "/projects/{project_id}/pullrequests/{pr_id}",
            get(get_pull_request),
        )
}

/// GET /projects
async fn list_projects(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<Project>>> {
    Ok(Json(handle_list_projects(&state, auth.id()).await?))
}

/// POST /projects
async fn create_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<CreateProjectResponse>)> {
    let response = handle_create_project(&state, auth.id(), request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /projects/{projectId}
async fn get_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project): Path<ProjectId>,
) -> Result<Json<ProjectOverview>> {
    Ok(Json(handle_get_project(&state, auth.id(), project).await?))
}

/// PATCH /projects/{projectId}
async fn update_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project): Path<ProjectId>,
    Json(request): Json<UpdateProjectRequest>,
) -> Result<StatusCode> {
    handle_update_project(&state, auth.id(), project, request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /projects/{projectId}/members
async fn add_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project): Path<ProjectId>,
    Json(request): Json<AddMemberRequest>,
) -> Result<StatusCode> {
    handle_add_member(&state, auth.id(), project, request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /projects/{projectId}/members/{userId}
async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project, member)): Path<(ProjectId, String)>,
) -> Result<StatusCode> {
    handle_remove_member(&state, auth.id(), project, &member).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /projects/{projectId}/pullrequests
async fn list_pull_requests(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project): Path<ProjectId>,
) -> Result<Json<Vec<PullRequest>>> {
    Ok(Json(handle_list_pull_requests(&state, auth.id(), project).await?))
}

/// POST /projects/{projectId}/pullrequests
async fn create_pull_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project): Path<ProjectId>,
    Json(input): Json<PullRequestInput>,
) -> Result<(StatusCode, Json<PullRequest>)> {
    let pr = handle_create_pull_request(&state, auth.id(), project, input).await?;
    Ok((StatusCode::CREATED, Json(pr)))
}

/// GET /projects/{projectId}/pullrequests/{prId}
async fn get_pull_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project, pr)): Path<(ProjectId, PullRequestId)>,
) -> Result<Json<PullRequest>> {
    Ok(Json(handle_get_pull_request(&state, auth.id(), project, pr).await?))
}
