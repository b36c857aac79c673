//! Assignment submission and grading routes.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::{AdminUser, AuthUser};
use super::response::{ApiError, ApiResponse, ApiResult};
use crate::services::assignment::{
    self, Assignment, AssignmentError, AssignmentFilters, AssignmentGrade, AssignmentPage, AssignmentStats,
    AssignmentSubmit,
};
use crate::services::auth::UserRole;
use crate::state::AppState;

pub(crate) fn assignment_error_to_api(err: AssignmentError) -> ApiError {
    match err {
        AssignmentError::NotFound | AssignmentError::NotEnrolled => ApiError::not_found(err.to_string()),
        AssignmentError::Validation(msg) => ApiError::bad_request(msg),
        AssignmentError::Database(e) => ApiError::internal(e),
    }
}

#[derive(Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /api/v1/assignments/me`
pub async fn mine(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PageParams>,
) -> ApiResult<AssignmentPage> {
    let page = assignment::mine(&state.pool, auth.user.id, params.limit, params.offset)
        .await
        .map_err(assignment_error_to_api)?;
    Ok(ApiResponse::ok(format!("Found {} assignments", page.total_count), page))
}

/// `POST /api/v1/assignments/workshop/{id}/submit`
pub async fn submit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(workshop_id): Path<Uuid>,
    Json(body): Json<AssignmentSubmit>,
) -> ApiResult<Assignment> {
    let submitted = assignment::submit(&state.pool, auth.user.id, workshop_id, &body)
        .await
        .map_err(assignment_error_to_api)?;
    Ok(ApiResponse::ok("Assignment submitted successfully", submitted))
}

/// `GET /api/v1/assignments/workshop/{id}/me`
pub async fn mine_for_workshop(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(workshop_id): Path<Uuid>,
) -> ApiResult<Assignment> {
    let found = assignment::for_user_in_workshop(&state.pool, auth.user.id, workshop_id)
        .await
        .map_err(assignment_error_to_api)?;
    Ok(ApiResponse::ok("Assignment retrieved successfully", found))
}

/// `GET /api/v1/assignments/{id}`: owner or admin.
pub async fn get_one(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(assignment_id): Path<i64>,
) -> ApiResult<Assignment> {
    let found = assignment::get(&state.pool, assignment_id).await.map_err(assignment_error_to_api)?;
    if found.user_id != auth.user.id && auth.user.role != UserRole::Admin {
        return Err(ApiError::forbidden("You can only view your own assignments"));
    }
    Ok(ApiResponse::ok("Assignment retrieved successfully", found))
}

/// `GET /api/v1/assignments` (admin)
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filters): Query<AssignmentFilters>,
) -> ApiResult<AssignmentPage> {
    let page = assignment::list(&state.pool, &filters).await.map_err(assignment_error_to_api)?;
    Ok(ApiResponse::ok(format!("Found {} assignments", page.total_count), page))
}

/// `PATCH /api/v1/assignments/{id}/grade` (admin)
pub async fn grade(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(assignment_id): Path<i64>,
    Json(body): Json<AssignmentGrade>,
) -> ApiResult<Assignment> {
    let graded = assignment::grade(&state.pool, assignment_id, &body)
        .await
        .map_err(assignment_error_to_api)?;
    tracing::info!(admin_id = %admin.id, assignment_id, status = %body.status, "assignment graded");
    Ok(ApiResponse::ok(body.summary(), graded))
}

/// `GET /api/v1/assignments/workshop/{id}/stats` (admin)
pub async fn stats(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(workshop_id): Path<Uuid>,
) -> ApiResult<AssignmentStats> {
    let stats = assignment::stats(&state.pool, workshop_id).await.map_err(assignment_error_to_api)?;
    Ok(ApiResponse::ok("Assignment statistics retrieved successfully", stats))
}

#[cfg(test)]
#[path = "assignments_test.rs"]
mod tests;
