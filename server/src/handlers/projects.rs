//! Project, membership and pull request handlers.

use grove_engine::{
    Project, ProjectId, ProjectOverview, PullRequest, PullRequestId, PullRequestInput, Version,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::AppState;

/// Request body for creating a project.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A new project and its first version.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectResponse {
    pub project: Project,
    pub version: Version,
}

/// Request body for updating a project.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub description: String,
}

/// Request body for adding a member.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: String,
}

pub async fn handle_list_projects(state: &AppState, user: &str) -> Result<Vec<Project>> {
    state.read(|graph| Ok(graph.list_projects(user))).await
}

pub async fn handle_create_project(
    state: &AppState,
    user: &str,
    request: CreateProjectRequest,
) -> Result<CreateProjectResponse> {
    let (project, version) = state
        .mutate(|graph, now| {
            graph.create_project(user, &request.name, request.description.as_deref(), now)
        })
        .await?;
    tracing::info!(project = %project.id, user, "Project created");
    Ok(CreateProjectResponse { project, version })
}

pub async fn handle_get_project(
    state: &AppState,
    user: &str,
    project: ProjectId,
) -> Result<ProjectOverview> {
    state.read(|graph| graph.get_project(user, &project)).await
}

pub async fn handle_update_project(
    state: &AppState,
    user: &str,
    project: ProjectId,
    request: UpdateProjectRequest,
) -> Result<()> {
    state
        .mutate(|graph, now| graph.update_project(user, &project, &request.description, now))
        .await
}

pub async fn handle_add_member(
    state: &AppState,
    user: &str,
    project: ProjectId,
    request: AddMemberRequest,
) -> Result<()> {
    state
        .mutate(|graph, now| graph.add_member(user, &project, &request.user_id, now))
        .await
}

pub async fn handle_remove_member(
    state: &AppState,
    user: &str,
    project: ProjectId,
    member: &str,
) -> Result<()> {
    state
        .mutate(|graph, now| graph.remove_member(user, &project, member, now))
        .await
}

pub async fn handle_create_pull_request(
    state: &AppState,
    user: &str,
    project: ProjectId,
    input: PullRequestInput,
) -> Result<PullRequest> {
    let pr = state
        .mutate(|graph, now| graph.create_pull_request(user, &project, input, now))
        .await?;
    tracing::info!(%project, pull_request = %pr.id, user, "Pull request opened");
    Ok(pr)
}

pub async fn handle_list_pull_requests(
    state: &AppState,
    user: &str,
    project: ProjectId,
) -> Result<Vec<PullRequest>> {
    state
        .read(|graph| graph.list_pull_requests(user, &project))
        .await
}

pub async fn handle_get_pull_request(
    state: &AppState,
    user: &str,
    project: ProjectId,
    pr: PullRequestId,
) -> Result<PullRequest> {
    state
        .read(|graph| graph.get_pull_request(user, &project, &pr))
        .await
}
