//! Project Handlers
//!
//! Registry of carbon-offset projects: listing, ownership-gated edits,
//! verifier review and credit issuance.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::error::AppResult;
use crate::handlers::auth::AuthUser;
use crate::models::project::{
    CreateProjectRequest, DeleteProjectResponse, IssueCreditsRequest, ProjectListResponse,
    ProjectQuery, ProjectStatsResponse, ProjectView, UpdateProjectRequest,
};
use crate::services::project_service;
use crate::AppState;

/// Get a page of projects
///
/// GET /api/v1/projects
///
/// # Query Parameters
///
/// - `page` - 1-based page (default: 1)
/// - `limit` - Page size (default: 10, max: 100)
/// - `projectType`, `status`, `vintageYear` - exact filters
/// - `search` - substring match on name, description or location
pub async fn list_projects(
    State(state): State<AppState>,
    query: Result<Query<ProjectQuery>, QueryRejection>,
) -> AppResult<Json<ProjectListResponse>> {
    let Query(query) = query?;
    let page = project_service::list_projects(&state.db, &query).await?;
    Ok(Json(page))
}

/// GET /api/v1/projects/{project_id}
pub async fn get_project(
    State(state): State<AppState>,
    project_id: Result<Path<String>, PathRejection>,
) -> AppResult<Json<ProjectView>> {
    let Path(project_id) = project_id?;
    let project = project_service::get_project(&state.db, &project_id).await?;
    Ok(Json(ProjectView::from(project)))
}

/// GET /api/v1/projects/user/my-projects
pub async fn my_projects(
    State(state): State<AppState>,
    caller: AuthUser,
) -> AppResult<Json<Vec<ProjectView>>> {
    let projects = project_service::projects_for_owner(&state.db, &caller.wallet).await?;
    Ok(Json(projects.into_iter().map(ProjectView::from).collect()))
}

/// GET /api/v1/projects/stats/project-stats
pub async fn project_stats(State(state): State<AppState>) -> AppResult<Json<ProjectStatsResponse>> {
    Ok(Json(project_service::project_stats(&state.db).await?))
}

/// POST /api/v1/projects
///
/// The caller becomes the owner. New projects start `pending` with no
/// credits issued.
pub async fn create_project(
    State(state): State<AppState>,
    caller: AuthUser,
    payload: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ProjectView>)> {
    let Json(request) = payload?;
    let project = project_service::create_project(&state.db, &caller.wallet, request).await?;
    Ok((StatusCode::CREATED, Json(ProjectView::from(project))))
}

/// PUT /api/v1/projects/{project_id}
pub async fn update_project(
    State(state): State<AppState>,
    caller: AuthUser,
    project_id: Result<Path<String>, PathRejection>,
    payload: Result<Json<UpdateProjectRequest>, JsonRejection>,
) -> AppResult<Json<ProjectView>> {
    let Path(project_id) = project_id?;
    let Json(request) = payload?;
    let project =
        project_service::update_project(&state.db, &caller.user, &project_id, request).await?;
    Ok(Json(ProjectView::from(project)))
}

/// DELETE /api/v1/projects/{project_id}
pub async fn delete_project(
    State(state): State<AppState>,
    caller: AuthUser,
    project_id: Result<Path<String>, PathRejection>,
) -> AppResult<Json<DeleteProjectResponse>> {
    let Path(project_id) = project_id?;
    project_service::delete_project(&state.db, &caller.user, &project_id).await?;
    Ok(Json(DeleteProjectResponse {
        success: true,
        message: format!("Project {} deleted", project_id),
    }))
}

/// PATCH /api/v1/projects/{project_id}/verify
pub async fn verify_project(
    State(state): State<AppState>,
    caller: AuthUser,
    project_id: Result<Path<String>, PathRejection>,
) -> AppResult<Json<ProjectView>> {
    let Path(project_id) = project_id?;
    let project = project_service::verify_project(&state.db, &caller.user, &project_id).await?;
    Ok(Json(ProjectView::from(project)))
}

/// PATCH /api/v1/projects/{project_id}/reject
pub async fn reject_project(
    State(state): State<AppState>,
    caller: AuthUser,
    project_id: Result<Path<String>, PathRejection>,
) -> AppResult<Json<ProjectView>> {
    let Path(project_id) = project_id?;
    let project = project_service::reject_project(&state.db, &caller.user, &project_id).await?;
    Ok(Json(ProjectView::from(project)))
}

/// POST /api/v1/projects/{project_id}/issue
///
/// Adds `amount` to `creditsIssued` and records the issuance in the ledger
/// in one database transaction.
pub async fn issue_credits(
    State(state): State<AppState>,
    caller: AuthUser,
    project_id: Result<Path<String>, PathRejection>,
    payload: Result<Json<IssueCreditsRequest>, JsonRejection>,
) -> AppResult<Json<ProjectView>> {
    let Path(project_id) = project_id?;
    let Json(request) = payload?;
    info!(project_id = %project_id, amount = request.amount, caller = %caller.wallet, "Credit issuance requested");

    let project =
        project_service::issue_credits(&state.db, &caller.user, &project_id, request.amount)
            .await?;
    Ok(Json(ProjectView::from(project)))
}
