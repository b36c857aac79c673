//! User profile, points, and admin listing routes.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::{AdminUser, AuthUser};
use super::response::{ApiError, ApiResponse, ApiResult};
use crate::services::auth::User;
use crate::services::user::{self, PointsResult, ProfileStatus, UserError, UserPage, UserSearchResult, UserUpdate, UserWithStatus};
use crate::state::AppState;

const DEFAULT_SEARCH_LIMIT: i64 = 20;
const DEFAULT_PAGE_LIMIT: i64 = 20;

pub(crate) fn user_error_to_api(err: UserError) -> ApiError {
    match err {
        UserError::NotFound => ApiError::not_found(err.to_string()),
        UserError::NoFields | UserError::Validation(_) | UserError::InvalidPoints => {
            ApiError::bad_request(err.to_string())
        }
        UserError::Database(e) => ApiError::internal(e),
    }
}

/// `GET /api/v1/users/me`
pub async fn me(auth: AuthUser) -> ApiResult<User> {
    Ok(ApiResponse::ok("User retrieved successfully", auth.user))
}

/// `PATCH /api/v1/users/me`
pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<UserUpdate>,
) -> ApiResult<UserWithStatus> {
    let updated = user::update_user(&state.pool, auth.user.id, &body).await.map_err(user_error_to_api)?;
    let message = format!(
        "User profile updated successfully. Profile {}% complete.",
        updated.profile_status.completion_percentage
    );
    Ok(ApiResponse::ok(message, updated))
}

/// `GET /api/v1/users/me/profile-status`
pub async fn profile_status(State(state): State<AppState>, auth: AuthUser) -> ApiResult<ProfileStatus> {
    let status = user::profile_status(&state.pool, auth.user.id).await.map_err(user_error_to_api)?;
    Ok(ApiResponse::ok(status.message(), status))
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<i64>,
}

/// `GET /api/v1/users/search?q=`
pub async fn search(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<SearchParams>,
) -> ApiResult<UserSearchResult> {
    let result = user::search_by_name(&state.pool, &params.q, params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT))
        .await
        .map_err(user_error_to_api)?;
    let message = if result.users.is_empty() {
        format!("No users found matching '{}'", result.search_query)
    } else {
        format!("Found {} users matching '{}'", result.total_count, result.search_query)
    };
    Ok(ApiResponse::ok(message, result))
}

#[derive(Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /api/v1/users` (admin)
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<PageParams>,
) -> ApiResult<UserPage> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let offset = params.offset.unwrap_or(0);
    let page = user::list_paginated(&state.pool, limit, offset).await.map_err(user_error_to_api)?;
    let message = format!("Retrieved {} users (page {})", page.users.len(), offset / limit + 1);
    Ok(ApiResponse::ok(message, page))
}

#[derive(Deserialize)]
pub struct PointsBody {
    pub amount: i32,
}

/// `POST /api/v1/users/{id}/points` (admin)
pub async fn add_points(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<PointsBody>,
) -> ApiResult<PointsResult> {
    let result = user::increment_points(&state.pool, user_id, body.amount).await.map_err(user_error_to_api)?;
    let message = format!("Added {} points. New total: {}", result.points_added, result.new_total);
    Ok(ApiResponse::ok(message, result))
}

/// `DELETE /api/v1/users/{id}` (admin)
pub async fn deactivate(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<User> {
    let deleted = user::soft_delete(&state.pool, user_id).await.map_err(user_error_to_api)?;
    tracing::info!(admin_id = %admin.id, %user_id, "user deactivated by admin");
    Ok(ApiResponse::ok(format!("User {} successfully deactivated", deleted.email), deleted))
}

#[cfg(test)]
#[path = "users_test.rs"]
mod tests;
